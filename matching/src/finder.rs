use chrono::DateTime;
use chrono::Utc;

use crate::config::MatchingConfig;
use crate::score::Jitter;
use crate::score::RandomJitter;
use crate::score::Scorer;
use crate::score::TokenOverlapScorer;
use crate::store::MatchStore;
use crate::types::Item;
use crate::types::Match;
use crate::types::Polarity;

/// Pairs a newly posted item with the active inventory of opposite polarity.
pub struct MatchFinder<S = TokenOverlapScorer> {
    scorer: S,
    cfg: MatchingConfig,
}

impl MatchFinder<TokenOverlapScorer> {
    /// Finder using the token-overlap scorer with random jitter.
    pub fn with_config(cfg: MatchingConfig) -> Self {
        Self::with_jitter(cfg, RandomJitter)
    }
}

impl<J: Jitter> MatchFinder<TokenOverlapScorer<J>> {
    /// Token-overlap finder whose scorer and pairing rules share one config.
    pub fn with_jitter(cfg: MatchingConfig, jitter: J) -> Self {
        Self::new(TokenOverlapScorer::with_jitter(cfg.clone(), jitter), cfg)
    }
}

impl<S: Scorer> MatchFinder<S> {
    /// Finder around an arbitrary scorer. `cfg` supplies the threshold and
    /// the self-match rule; the scorer keeps its own parameters.
    pub fn new(scorer: S, cfg: MatchingConfig) -> Self {
        Self { scorer, cfg }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.cfg
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Score `new_item` against `inventory` and return the qualifying pairs
    /// as pending matches stamped with `now`. Nothing is stored.
    ///
    /// Malformed records are skipped: a malformed candidate is left out of
    /// the pass, a malformed `new_item` yields no matches.
    pub fn evaluate(&self, new_item: &Item, inventory: &[Item], now: DateTime<Utc>) -> Vec<Match> {
        if let Err(e) = new_item.validate() {
            tracing::warn!("not matching new item: {e}");
            return Vec::new();
        }
        let wanted = new_item.polarity.opposite();
        let mut out = Vec::new();
        for candidate in inventory {
            if candidate.polarity != wanted || !candidate.is_active() || candidate.id == new_item.id
            {
                continue;
            }
            if let Err(e) = candidate.validate() {
                tracing::warn!("skipping candidate: {e}");
                continue;
            }
            let (lost, found) = match new_item.polarity {
                Polarity::Lost => (new_item, candidate),
                Polarity::Found => (candidate, new_item),
            };
            if self.cfg.exclude_self_matches && lost.owner == found.owner {
                tracing::debug!(
                    "skipping self-match {} / {} for {}",
                    lost.id,
                    found.id,
                    lost.owner
                );
                continue;
            }
            let score = self.scorer.score(lost, found);
            tracing::debug!(
                "scored lost={} found={} score={score} scorer={}",
                lost.id,
                found.id,
                self.scorer.name()
            );
            if score >= self.cfg.threshold {
                out.push(Match::pending(lost, found, score, now));
            }
        }
        out
    }

    /// Run [`evaluate`](Self::evaluate) and append every qualifying match to
    /// `store`. Returns the matches that were newly recorded; pairs the store
    /// already holds are dropped silently.
    pub fn find_matches(
        &self,
        new_item: &Item,
        inventory: &[Item],
        store: &(impl MatchStore + ?Sized),
    ) -> anyhow::Result<Vec<Match>> {
        let mut recorded = Vec::new();
        for m in self.evaluate(new_item, inventory, Utc::now()) {
            if store.append(m.clone())? {
                tracing::info!(
                    "match {} recorded (score {}) for {} and {}",
                    m.id,
                    m.score,
                    m.lost_owner,
                    m.found_owner
                );
                recorded.push(m);
            } else {
                tracing::debug!("match {} already recorded", m.id);
            }
        }
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::NoJitter;
    use crate::store::MemoryStore;
    use crate::types::Category;
    use crate::types::ItemStatus;
    use crate::types::Location;
    use pretty_assertions::assert_eq;

    fn item(id: &str, polarity: Polarity, title: &str, owner: &str) -> Item {
        Item {
            id: id.to_string(),
            polarity,
            title: title.to_string(),
            description: format!("{title} near the canteen"),
            category: Category::Electronics,
            location: Location::Canteen,
            image: None,
            owner: owner.to_string(),
            created_at: Utc::now(),
            status: ItemStatus::Active,
        }
    }

    fn finder(cfg: MatchingConfig) -> MatchFinder<TokenOverlapScorer<NoJitter>> {
        MatchFinder::with_jitter(cfg, NoJitter)
    }

    #[test]
    fn orders_participants_by_polarity() {
        let f = finder(MatchingConfig::default());
        let lost = item("L", Polarity::Lost, "laptop charger", "a");
        let found = item("F", Polarity::Found, "laptop charger", "b");

        let from_found = f.evaluate(&found, std::slice::from_ref(&lost), Utc::now());
        let from_lost = f.evaluate(&lost, std::slice::from_ref(&found), Utc::now());
        assert_eq!(from_found.len(), 1);
        assert_eq!(from_found[0].lost_item_id, "L");
        assert_eq!(from_found[0].found_item_id, "F");
        assert_eq!(from_found[0].lost_owner, "a");
        assert_eq!(from_found[0].found_owner, "b");
        assert_eq!(from_found[0].id, from_lost[0].id);
    }

    #[test]
    fn skips_same_polarity_resolved_and_malformed() {
        let f = finder(MatchingConfig::default());
        let new_item = item("F", Polarity::Found, "laptop charger", "b");
        let same = item("F2", Polarity::Found, "laptop charger", "c");
        let mut resolved = item("L1", Polarity::Lost, "laptop charger", "a");
        resolved.status = ItemStatus::Resolved;
        let mut malformed = item("L2", Polarity::Lost, "laptop charger", "a");
        malformed.title = String::new();
        let good = item("L3", Polarity::Lost, "laptop charger", "d");

        let out = f.evaluate(&new_item, &[same, resolved, malformed, good], Utc::now());
        let ids: Vec<_> = out.iter().map(|m| m.lost_item_id.as_str()).collect();
        assert_eq!(ids, vec!["L3"]);
    }

    #[test]
    fn malformed_new_item_matches_nothing() {
        let f = finder(MatchingConfig::default());
        let mut new_item = item("F", Polarity::Found, "laptop charger", "b");
        new_item.owner = " ".into();
        let lost = item("L", Polarity::Lost, "laptop charger", "a");
        assert!(f.evaluate(&new_item, &[lost], Utc::now()).is_empty());
    }

    #[test]
    fn self_matches_follow_config() {
        let lost = item("L", Polarity::Lost, "laptop charger", "same@cit.edu");
        let found = item("F", Polarity::Found, "laptop charger", "same@cit.edu");

        let strict = finder(MatchingConfig::default());
        assert!(strict.evaluate(&found, std::slice::from_ref(&lost), Utc::now()).is_empty());

        let lenient = finder(MatchingConfig {
            exclude_self_matches: false,
            ..MatchingConfig::default()
        });
        assert_eq!(lenient.evaluate(&found, &[lost], Utc::now()).len(), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let lost = item("L", Polarity::Lost, "laptop charger", "a");
        let found = item("F", Polarity::Found, "laptop charger", "b");
        let scorer = TokenOverlapScorer::with_jitter(MatchingConfig::default(), NoJitter);
        let score = scorer.score(&lost, &found);

        let at = finder(MatchingConfig {
            threshold: score,
            ..MatchingConfig::default()
        });
        assert_eq!(at.evaluate(&found, std::slice::from_ref(&lost), Utc::now()).len(), 1);

        if score < 10 {
            let above = finder(MatchingConfig {
                threshold: score + 1,
                ..MatchingConfig::default()
            });
            assert!(above.evaluate(&found, &[lost], Utc::now()).is_empty());
        }
    }

    #[test]
    fn token_overlap_finder_shares_one_config() {
        let cfg = MatchingConfig {
            threshold: 9,
            category_bonus: 5,
            exclude_self_matches: false,
            ..MatchingConfig::default()
        };
        let f = finder(cfg.clone());
        assert_eq!(f.config(), &cfg);
        assert_eq!(f.scorer().config(), &cfg);
    }

    #[test]
    fn find_matches_is_idempotent() {
        let f = finder(MatchingConfig::default());
        let store = MemoryStore::new();
        let found = item("F", Polarity::Found, "laptop charger", "b");
        let inventory = vec![
            item("L1", Polarity::Lost, "laptop charger", "a"),
            item("L2", Polarity::Lost, "laptop charger", "c"),
        ];

        let first = f.find_matches(&found, &inventory, &store).unwrap();
        let second = f.find_matches(&found, &inventory, &store).unwrap();
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(store.list_matches().unwrap().len(), 2);
    }
}
