use crate::types::Category;
use crate::types::Item;
use crate::types::ItemStatus;
use crate::types::Match;
use crate::types::Polarity;

/// Append-only holder of [`Match`] records.
///
/// `append` is idempotent on the derived match id: inserting a match whose id
/// is already present leaves the store unchanged and returns `false`.
/// Queries return matches in insertion order.
pub trait MatchStore: Send + Sync {
    fn append(&self, m: Match) -> anyhow::Result<bool>;
    fn get_match(&self, id: &str) -> anyhow::Result<Option<Match>>;
    fn list_matches(&self) -> anyhow::Result<Vec<Match>>;
    /// Matches where `user` owns either the lost or the found item.
    fn query_by_participant(&self, user: &str) -> anyhow::Result<Vec<Match>> {
        Ok(self
            .list_matches()?
            .into_iter()
            .filter(|m| m.involves(user))
            .collect())
    }
    /// Pending matches that reference `item_id` on either side.
    fn matches_for_item(&self, item_id: &str) -> anyhow::Result<Vec<Match>> {
        Ok(self
            .list_matches()?
            .into_iter()
            .filter(|m| m.is_pending() && m.references_item(item_id))
            .collect())
    }
    /// Move a match from pending to resolved.
    fn resolve_match(&self, id: &str) -> anyhow::Result<()>;
}

/// Browse filter over the inventory.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub polarity: Option<Polarity>,
    pub category: Option<Category>,
    /// Case-insensitive substring of the title or description.
    pub text: Option<String>,
    pub include_resolved: bool,
}

impl ItemQuery {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn everything() -> Self {
        Self {
            include_resolved: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        if !self.include_resolved && item.status != ItemStatus::Active {
            return false;
        }
        if let Some(p) = self.polarity
            && item.polarity != p
        {
            return false;
        }
        if let Some(c) = self.category
            && item.category != c
        {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !needle.is_empty()
                && !item.title.to_lowercase().contains(&needle)
                && !item.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Durable holder of posted items.
pub trait ItemStore: Send + Sync {
    fn add_item(&self, item: Item) -> anyhow::Result<()>;
    fn get_item(&self, id: &str) -> anyhow::Result<Option<Item>>;
    /// Items accepted by `query`, in insertion order.
    fn list_items(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>>;
    /// Move an item from active to resolved.
    fn resolve_item(&self, id: &str) -> anyhow::Result<()>;
}

/// A backend holding both items and matches.
pub trait Store: ItemStore + MatchStore {
    fn stats(&self) -> anyhow::Result<serde_json::Value> {
        let items = self.list_items(&ItemQuery::everything())?;
        let matches = self.list_matches()?;
        Ok(stats_json(&items, &matches))
    }
}

pub(crate) fn stats_json(items: &[Item], matches: &[Match]) -> serde_json::Value {
    let active = items.iter().filter(|i| i.is_active()).count();
    let lost = items
        .iter()
        .filter(|i| i.polarity == Polarity::Lost)
        .count();
    let pending = matches.iter().filter(|m| m.is_pending()).count();
    serde_json::json!({
        "items": {
            "total": items.len(),
            "active": active,
            "resolved": items.len() - active,
            "by_polarity": {
                "lost": lost,
                "found": items.len() - lost,
            },
        },
        "matches": {
            "total": matches.len(),
            "pending": pending,
            "resolved": matches.len() - pending,
        },
    })
}

pub mod jsonl;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
