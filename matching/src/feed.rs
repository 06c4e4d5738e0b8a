use serde::Serialize;

use crate::store::MatchStore;
use crate::types::Match;

/// Pending matches in which `user` owns the lost or the found item, in the
/// order they appear in `matches`.
pub fn derive_feed(user: &str, matches: &[Match]) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| m.is_pending() && m.involves(user))
        .cloned()
        .collect()
}

/// A user's notification feed. Drives both the badge and the detail list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationFeed {
    pub user: String,
    pub entries: Vec<Match>,
}

impl NotificationFeed {
    pub fn from_matches(user: &str, matches: &[Match]) -> Self {
        Self {
            user: user.to_string(),
            entries: derive_feed(user, matches),
        }
    }

    /// Build the feed from the store's participant index.
    pub fn load(store: &(impl MatchStore + ?Sized), user: &str) -> anyhow::Result<Self> {
        let matches = store.query_by_participant(user)?;
        Ok(Self::from_matches(user, &matches))
    }

    pub fn badge_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchStatus;
    use chrono::Utc;

    fn m(id: &str, lost_owner: &str, found_owner: &str, status: MatchStatus) -> Match {
        Match {
            id: id.to_string(),
            lost_item_id: format!("{id}-lost"),
            found_item_id: format!("{id}-found"),
            lost_owner: lost_owner.to_string(),
            found_owner: found_owner.to_string(),
            score: 7,
            created_at: Utc::now(),
            status,
        }
    }

    #[test]
    fn feed_keeps_order_and_drops_others() {
        let all = vec![
            m("1", "ann", "bob", MatchStatus::Pending),
            m("2", "carl", "dee", MatchStatus::Pending),
            m("3", "eve", "ann", MatchStatus::Pending),
            m("4", "ann", "bob", MatchStatus::Resolved),
        ];
        let feed = derive_feed("ann", &all);
        let ids: Vec<_> = feed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(feed.iter().all(|m| m.involves("ann")));
    }

    #[test]
    fn unknown_user_gets_empty_feed() {
        let all = vec![m("1", "ann", "bob", MatchStatus::Pending)];
        let feed = NotificationFeed::from_matches("zed", &all);
        assert!(feed.is_empty());
        assert_eq!(feed.badge_count(), 0);
    }
}
