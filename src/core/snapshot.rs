use crate::storage::CacheEntry;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    cmp::{Ordering, Reverse},
    collections::HashMap,
    sync::Arc,
};

/// A user with the rank computed at the last rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub rank: usize,
}

/// One immutable generation of the leaderboard.
///
/// `entries` and `rank_index` are built in the same pass and published
/// together, so a reader holding a `Snapshot` always sees a consistent pair.
#[derive(Debug)]
pub struct Snapshot {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    entries: Vec<RankedEntry>,
    rank_index: HashMap<String, usize>,
}

impl Snapshot {
    fn empty() -> Snapshot {
        Snapshot {
            generation: 0,
            built_at: Utc::now(),
            entries: Vec::new(),
            rank_index: HashMap::new(),
        }
    }

    /// Sorts by score descending, then name ascending, and assigns
    /// competition ranks: equal scores share a rank and the next distinct
    /// score takes its 1-based position.
    fn build(generation: u64, all_entries: HashMap<String, CacheEntry>) -> Snapshot {
        let mut entries: Vec<RankedEntry> = all_entries
            .into_iter()
            .map(|(id, e)| RankedEntry {
                id,
                name: e.name,
                score: e.score,
                rank: 0,
            })
            .collect();

        // id as last resort so identical (score, name) pairs never depend on
        // hash map iteration order
        entries.sort_unstable_by(ranking_order);

        let mut rank_index = HashMap::with_capacity(entries.len());
        let mut current_rank = 1;
        let mut previous_score = None;
        for (position, entry) in entries.iter_mut().enumerate() {
            if previous_score.is_some_and(|score| score != entry.score) {
                current_rank = position + 1;
            }
            previous_score = Some(entry.score);
            entry.rank = current_rank;
            rank_index.insert(entry.id.clone(), current_rank);
        }

        Snapshot {
            generation,
            built_at: Utc::now(),
            entries,
            rank_index,
        }
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 0 when the id is not part of this generation.
    pub fn rank_of(&self, id: &str) -> usize {
        self.rank_index.get(id).copied().unwrap_or(0)
    }
}

fn ranking_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    (Reverse(a.score), &a.name, &a.id).cmp(&(Reverse(b.score), &b.name, &b.id))
}

/// Publishes ranked snapshots and serves every read from the current one.
///
/// Readers load the current generation without taking a lock; a rebuild
/// prepares the next generation off to the side and swaps it in with a single
/// pointer store. A reader either gets the old generation or the new one.
pub struct RankingSnapshot {
    current: ArcSwap<Snapshot>,
}

impl RankingSnapshot {
    pub fn new() -> RankingSnapshot {
        RankingSnapshot {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// O(N log N). Callers should batch writes rather than call this per write.
    pub fn rebuild(&self, all_entries: HashMap<String, CacheEntry>) -> Arc<Snapshot> {
        let generation = self.current.load().generation + 1;
        let next = Arc::new(Snapshot::build(generation, all_entries));
        self.current.store(next.clone());
        next
    }

    /// The generation currently published. Hold it to run several reads
    /// against the same view.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// 1-indexed page, along with the total number of ranked entries.
    ///
    /// Page 0 or a page past the end is an empty page, never an error.
    pub fn get_page(&self, page: usize, limit: usize) -> (Vec<RankedEntry>, usize) {
        let snapshot = self.current.load();
        let total = snapshot.len();
        let start = match page.checked_sub(1).and_then(|p| p.checked_mul(limit)) {
            Some(start) if start < total => start,
            _ => return (Vec::new(), total),
        };
        let end = start.saturating_add(limit).min(total);
        (snapshot.entries[start..end].to_vec(), total)
    }

    pub fn get_top(&self, n: usize) -> Vec<RankedEntry> {
        let snapshot = self.current.load();
        let n = n.min(snapshot.len());
        snapshot.entries[..n].to_vec()
    }

    pub fn get_rank(&self, id: &str) -> usize {
        self.current.load().rank_of(id)
    }

    pub fn size(&self) -> usize {
        self.current.load().len()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }
}

impl Default for RankingSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
