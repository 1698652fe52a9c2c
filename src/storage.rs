use itertools::Itertools;
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

/// Current name and score of a user, keyed by user id in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheEntry {
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub score: i64,
}

type SharedEntries = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// Authoritative in-memory view of every user's current score.
///
/// Cloning the cache hands out another handle to the same map. Readers run
/// concurrently, writers are serialized by the lock and the last write for a
/// given id wins.
#[derive(Clone, Default)]
pub struct EntryCache {
    data: SharedEntries,
}

impl EntryCache {
    pub fn new() -> EntryCache {
        EntryCache {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn set(&self, id: impl Into<String>, entry: CacheEntry) {
        self.data.write().insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<CacheEntry> {
        self.data.read().get(id).cloned()
    }

    /// Removes the entry, returning it if it was present.
    pub fn delete(&self, id: &str) -> Option<CacheEntry> {
        self.data.write().remove(id)
    }

    pub fn size(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&self) {
        self.data.write().clear();
    }

    /// Full copy of the cache, taken under a single read lock.
    pub fn snapshot_all(&self) -> HashMap<String, CacheEntry> {
        self.data.read().clone()
    }

    /// Case-insensitive prefix match on names, best scores first.
    ///
    /// This is a linear scan: there is no secondary index on names.
    pub fn search_by_prefix(&self, prefix: &str, limit: usize) -> Vec<SearchHit> {
        let prefix = prefix.to_lowercase();
        let data = self.data.read();
        data.iter()
            .filter(|(_id, e)| e.name.to_lowercase().starts_with(&prefix))
            .map(|(id, e)| SearchHit {
                id: id.clone(),
                name: e.name.clone(),
                score: e.score,
            })
            // ties broken on name then id so results are stable between calls
            .sorted_unstable_by(|a, b| {
                (Reverse(a.score), &a.name, &a.id).cmp(&(Reverse(b.score), &b.name, &b.id))
            })
            .take(limit)
            .collect()
    }
}
