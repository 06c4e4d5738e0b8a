use chrono::Utc;
use lostfound_matching::factory::Backend;
use lostfound_matching::factory::open_store;
use lostfound_matching::store::ItemQuery;
use lostfound_matching::store::ItemStore;
use lostfound_matching::store::MatchStore;
use lostfound_matching::store::MemoryStore;
use lostfound_matching::store::Store;
use lostfound_matching::types::*;
use pretty_assertions::assert_eq;

fn backends() -> Vec<Backend> {
    #[cfg(feature = "sqlite")]
    {
        vec![Backend::Jsonl, Backend::Sqlite]
    }
    #[cfg(not(feature = "sqlite"))]
    {
        vec![Backend::Jsonl]
    }
}

fn sample_item(id: &str, polarity: Polarity, title: &str, owner: &str) -> Item {
    Item {
        id: id.to_string(),
        polarity,
        title: title.to_string(),
        description: format!("{title} with a sticker"),
        category: Category::Electronics,
        location: Location::Library,
        image: None,
        owner: owner.to_string(),
        created_at: "2025-01-01T00:00:00Z".parse().unwrap(),
        status: ItemStatus::Active,
    }
}

fn sample_match(lost: &Item, found: &Item) -> Match {
    Match::pending(lost, found, 8, Utc::now())
}

/// Exercise one store through the whole contract.
fn check_store(store: &dyn Store) {
    let lost = sample_item("L1", Polarity::Lost, "Phone", "ann@cit.edu");
    let found = sample_item("F1", Polarity::Found, "phone case", "bob@cit.edu");
    let other = sample_item("F2", Polarity::Found, "Calculator", "cat@cit.edu");

    // items
    store.add_item(lost.clone()).unwrap();
    store.add_item(found.clone()).unwrap();
    store.add_item(other.clone()).unwrap();
    assert!(store.add_item(lost.clone()).is_err());
    assert_eq!(store.get_item("L1").unwrap().unwrap(), lost);
    assert!(store.get_item("nope").unwrap().is_none());

    let found_only = ItemQuery {
        polarity: Some(Polarity::Found),
        ..ItemQuery::default()
    };
    let ids: Vec<_> = store
        .list_items(&found_only)
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec!["F1", "F2"]);

    let search = ItemQuery {
        text: Some("PHONE".into()),
        ..ItemQuery::default()
    };
    assert_eq!(store.list_items(&search).unwrap().len(), 2);

    store.resolve_item("F2").unwrap();
    assert!(store.resolve_item("nope").is_err());
    assert_eq!(store.list_items(&ItemQuery::active()).unwrap().len(), 2);
    assert_eq!(store.list_items(&ItemQuery::everything()).unwrap().len(), 3);

    // matches: idempotent append, insertion order, participant queries
    let m1 = sample_match(&lost, &found);
    let m2 = sample_match(&lost, &other);
    assert!(store.append(m1.clone()).unwrap());
    assert!(!store.append(m1.clone()).unwrap());
    assert!(store.append(m2.clone()).unwrap());
    assert_eq!(store.list_matches().unwrap().len(), 2);

    let ann: Vec<_> = store
        .query_by_participant("ann@cit.edu")
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ann, vec![m1.id.clone(), m2.id.clone()]);
    assert_eq!(store.query_by_participant("cat@cit.edu").unwrap().len(), 1);
    assert!(store.query_by_participant("zed@cit.edu").unwrap().is_empty());

    assert_eq!(store.matches_for_item("L1").unwrap().len(), 2);
    store.resolve_match(&m2.id).unwrap();
    assert!(store.resolve_match("nope").is_err());
    assert_eq!(
        store.get_match(&m2.id).unwrap().unwrap().status,
        MatchStatus::Resolved
    );
    let pending: Vec<_> = store
        .matches_for_item("L1")
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(pending, vec![m1.id.clone()]);

    // stats
    let stats = store.stats().unwrap();
    assert_eq!(stats["items"]["total"], 3);
    assert_eq!(stats["items"]["active"], 2);
    assert_eq!(stats["items"]["resolved"], 1);
    assert_eq!(stats["items"]["by_polarity"]["lost"], 1);
    assert_eq!(stats["items"]["by_polarity"]["found"], 2);
    assert_eq!(stats["matches"]["total"], 2);
    assert_eq!(stats["matches"]["pending"], 1);
    assert_eq!(stats["matches"]["resolved"], 1);
}

#[test]
fn persistent_backends_honor_store_contract() {
    for be in backends() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path(), Some(be)).unwrap();
        check_store(store.as_ref());
    }
}

#[test]
fn memory_store_honors_store_contract() {
    check_store(&MemoryStore::new());
}

#[test]
fn persistent_backends_survive_reopen() {
    for be in backends() {
        let dir = tempfile::tempdir().unwrap();
        let lost = sample_item("L1", Polarity::Lost, "Phone", "ann@cit.edu");
        let found = sample_item("F1", Polarity::Found, "phone", "bob@cit.edu");
        {
            let store = open_store(dir.path(), Some(be)).unwrap();
            store.add_item(lost.clone()).unwrap();
            store.append(sample_match(&lost, &found)).unwrap();
        }
        let store = open_store(dir.path(), Some(be)).unwrap();
        assert_eq!(store.get_item("L1").unwrap(), Some(lost.clone()));
        assert!(!store.append(sample_match(&lost, &found)).unwrap());
        assert_eq!(store.list_matches().unwrap().len(), 1);
    }
}

#[test]
fn concurrent_appends_record_each_pair_once() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let lost = sample_item("L1", Polarity::Lost, "Phone", "ann@cit.edu");
    let found = sample_item("F1", Polarity::Found, "phone", "bob@cit.edu");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let m = sample_match(&lost, &found);
            std::thread::spawn(move || store.append(m).unwrap())
        })
        .collect();
    let inserted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|inserted| *inserted)
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(store.list_matches().unwrap().len(), 1);
}

#[test]
fn jsonl_store_skips_corrupt_lines() {
    let dir = tempfile::tempdir().unwrap();
    let store = lostfound_matching::store::JsonlStore::new(dir.path());
    let lost = sample_item("L1", Polarity::Lost, "Phone", "ann@cit.edu");
    store.add_item(lost.clone()).unwrap();
    let mut data = std::fs::read_to_string(store.items_path()).unwrap();
    data.push_str("{not json}\n\n");
    std::fs::write(store.items_path(), data).unwrap();
    assert_eq!(store.list_items(&ItemQuery::everything()).unwrap(), vec![lost]);
}

#[test]
fn ids_with_underscores_do_not_collide() {
    let check = |store: &dyn Store| {
        let lost_ab = sample_item("a_b", Polarity::Lost, "Phone", "u1@cit.edu");
        let found_c = sample_item("c", Polarity::Found, "phone", "u2@cit.edu");
        let lost_a = sample_item("a", Polarity::Lost, "Phone", "u3@cit.edu");
        let found_bc = sample_item("b_c", Polarity::Found, "phone", "u4@cit.edu");

        assert!(store.append(sample_match(&lost_ab, &found_c)).unwrap());
        assert!(store.append(sample_match(&lost_a, &found_bc)).unwrap());
        assert_eq!(store.list_matches().unwrap().len(), 2);
        assert_eq!(store.query_by_participant("u3@cit.edu").unwrap().len(), 1);
    };
    check(&MemoryStore::new());
    for be in backends() {
        let dir = tempfile::tempdir().unwrap();
        check(open_store(dir.path(), Some(be)).unwrap().as_ref());
    }
}

#[test]
fn jsonl_status_changes_keep_unreadable_lines() {
    let dir = tempfile::tempdir().unwrap();
    let store = lostfound_matching::store::JsonlStore::new(dir.path());
    let lost = sample_item("L1", Polarity::Lost, "Phone", "ann@cit.edu");
    let found = sample_item("F1", Polarity::Found, "phone", "bob@cit.edu");
    store.add_item(lost.clone()).unwrap();
    let m = sample_match(&lost, &found);
    store.append(m.clone()).unwrap();

    let odd_item = item_line_with_location("L2", "Gym");
    let mut data = std::fs::read_to_string(store.items_path()).unwrap();
    data.push_str(&odd_item);
    data.push('\n');
    std::fs::write(store.items_path(), data).unwrap();
    let mut data = std::fs::read_to_string(store.matches_path()).unwrap();
    data.push_str("{not json}\n");
    std::fs::write(store.matches_path(), data).unwrap();

    store.resolve_item("L1").unwrap();
    store.resolve_match(&m.id).unwrap();

    let items = std::fs::read_to_string(store.items_path()).unwrap();
    assert_eq!(items.lines().count(), 2);
    assert_eq!(items.lines().nth(1), Some(odd_item.as_str()));
    assert_eq!(
        store.get_item("L1").unwrap().unwrap().status,
        ItemStatus::Resolved
    );

    let matches = std::fs::read_to_string(store.matches_path()).unwrap();
    assert_eq!(matches.lines().collect::<Vec<_>>()[1], "{not json}");
    assert_eq!(
        store.get_match(&m.id).unwrap().unwrap().status,
        MatchStatus::Resolved
    );
}

fn item_line_with_location(id: &str, location: &str) -> String {
    format!(
        r#"{{"id":"{id}","polarity":"lost","title":"keys","description":"","category":"Keys","location":"{location}","owner":"ann@cit.edu","created_at":"2025-01-01T00:00:00Z","status":"active"}}"#
    )
}
