//! Shapes returned by the service to its callers.

use crate::core::debounce::Stats;
use crate::core::snapshot::RankedEntry;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub rating: i64,
    // 0 until the user appears in a published snapshot
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub rating: i64,
    pub rank: usize,
}

impl From<RankedEntry> for LeaderboardEntry {
    fn from(entry: RankedEntry) -> Self {
        LeaderboardEntry {
            user_id: entry.id,
            username: entry.name,
            rating: entry.score,
            rank: entry.rank,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub total_users: usize,
    pub total_pages: usize,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    pub updated: usize,
    pub duration_ms: u128,
    pub updates_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub total_users: usize,
    pub pending_updates: u64,
    pub total_updates: u64,
    pub rebuilds_triggered: u64,
    pub avg_updates_per_rebuild: f64,
    pub snapshot_generation: u64,
}

impl ServiceStats {
    pub fn new(total_users: usize, pending_updates: u64, stats: Stats, generation: u64) -> Self {
        ServiceStats {
            total_users,
            pending_updates,
            total_updates: stats.total_updates,
            rebuilds_triggered: stats.rebuilds_triggered,
            avg_updates_per_rebuild: stats.average_updates_per_rebuild,
            snapshot_generation: generation,
        }
    }
}
