use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use super::*;
use crate::types::MatchStatus;

#[derive(Debug, Default)]
struct Inner {
    items: Vec<Item>,
    matches: Vec<Match>,
    match_ids: HashSet<String>,
}

/// Process-local store. The id check and the insert of `append` happen under
/// one write lock, so concurrent finders cannot record the same pair twice.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl MatchStore for MemoryStore {
    fn append(&self, m: Match) -> anyhow::Result<bool> {
        let mut inner = self.write();
        if !inner.match_ids.insert(m.id.clone()) {
            return Ok(false);
        }
        inner.matches.push(m);
        Ok(true)
    }

    fn get_match(&self, id: &str) -> anyhow::Result<Option<Match>> {
        Ok(self.read().matches.iter().find(|m| m.id == id).cloned())
    }

    fn list_matches(&self) -> anyhow::Result<Vec<Match>> {
        Ok(self.read().matches.clone())
    }

    fn query_by_participant(&self, user: &str) -> anyhow::Result<Vec<Match>> {
        Ok(self
            .read()
            .matches
            .iter()
            .filter(|m| m.involves(user))
            .cloned()
            .collect())
    }

    fn resolve_match(&self, id: &str) -> anyhow::Result<()> {
        let mut inner = self.write();
        match inner.matches.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.status = MatchStatus::Resolved;
                Ok(())
            }
            None => anyhow::bail!("resolve_match: id not found: {id}"),
        }
    }
}

impl ItemStore for MemoryStore {
    fn add_item(&self, item: Item) -> anyhow::Result<()> {
        let mut inner = self.write();
        if inner.items.iter().any(|i| i.id == item.id) {
            let dup = &item.id;
            anyhow::bail!("add_item: duplicate id: {dup}");
        }
        inner.items.push(item);
        Ok(())
    }

    fn get_item(&self, id: &str) -> anyhow::Result<Option<Item>> {
        Ok(self.read().items.iter().find(|i| i.id == id).cloned())
    }

    fn list_items(&self, query: &ItemQuery) -> anyhow::Result<Vec<Item>> {
        Ok(self
            .read()
            .items
            .iter()
            .filter(|i| query.matches(i))
            .cloned()
            .collect())
    }

    fn resolve_item(&self, id: &str) -> anyhow::Result<()> {
        let mut inner = self.write();
        match inner.items.iter_mut().find(|i| i.id == id) {
            Some(i) => {
                i.status = ItemStatus::Resolved;
                Ok(())
            }
            None => anyhow::bail!("resolve_item: id not found: {id}"),
        }
    }
}

impl Store for MemoryStore {}
