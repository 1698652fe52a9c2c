use crate::config::Settings;
use crate::core::debounce::{DebounceSettings, RebuildScheduler};
use crate::core::snapshot::{RankingSnapshot, Snapshot};
use crate::error::{LeaderboardError, LeaderboardResult};
use crate::models::{
    BulkUpdateResult, LeaderboardEntry, LeaderboardPage, ServiceStats, UserResponse,
};
use crate::storage::{CacheEntry, EntryCache};
use crate::store::RecordStore;
use rand::{seq::SliceRandom, Rng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Entry point for callers: validates input, mirrors writes to the record
/// store, keeps the cache current and lets the scheduler fold writes into
/// snapshot rebuilds.
///
/// Reads are served from the published snapshot, so a rank can lag behind a
/// write until the next rebuild. The record store stays the source of truth.
pub struct LeaderboardService {
    store: Arc<dyn RecordStore>,
    cache: EntryCache,
    snapshot: Arc<RankingSnapshot>,
    scheduler: RebuildScheduler,
    settings: Settings,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn RecordStore>, settings: Settings) -> LeaderboardService {
        let cache = EntryCache::new();
        let snapshot = Arc::new(RankingSnapshot::new());
        let scheduler = RebuildScheduler::new(
            cache.clone(),
            snapshot.clone(),
            DebounceSettings::from(&settings),
        );
        LeaderboardService {
            store,
            cache,
            snapshot,
            scheduler,
            settings,
        }
    }

    /// Loads every record from the store into a fresh cache and publishes the
    /// first snapshot. Returns the number of users loaded.
    pub async fn initialize(&self) -> LeaderboardResult<usize> {
        let records = self.store.scan().await?;

        self.cache.clear();
        for record in records {
            self.cache.set(
                record.id,
                CacheEntry {
                    name: record.username,
                    score: record.score,
                },
            );
        }
        self.scheduler.force_rebuild();

        let loaded = self.cache.size();
        info!("Loaded {loaded} users from '{}' store into cache", self.store.name());
        Ok(loaded)
    }

    pub fn shutdown(&self) {
        info!("Shutting down leaderboard service.");
        self.scheduler.shutdown();
    }

    /// Out of range pages and limits are normalized, never rejected.
    pub fn leaderboard(&self, page: usize, limit: usize) -> LeaderboardPage {
        let page = page.max(1);
        let limit = match limit {
            l if l < 1 || l > self.settings.max_page_limit => self.settings.default_page_limit,
            l => l,
        };

        let (entries, total) = self.snapshot.get_page(page, limit);
        LeaderboardPage {
            entries: entries.into_iter().map(LeaderboardEntry::from).collect(),
            total_users: total,
            total_pages: total.div_ceil(limit),
            page,
        }
    }

    pub fn top(&self, n: usize) -> Vec<LeaderboardEntry> {
        let n = match n {
            0 => self.settings.default_top_n,
            n => n.min(self.settings.max_top_n),
        };
        self.snapshot
            .get_top(n)
            .into_iter()
            .map(LeaderboardEntry::from)
            .collect()
    }

    pub fn user(&self, id: &str) -> Option<UserResponse> {
        self.cache.get(id).map(|entry| UserResponse {
            user_id: id.to_string(),
            username: entry.name,
            rating: entry.score,
            rank: self.snapshot.get_rank(id),
        })
    }

    /// Name prefix search against the cache, annotated with snapshot ranks.
    pub fn search(&self, prefix: &str, limit: usize) -> LeaderboardResult<Vec<UserResponse>> {
        if prefix.is_empty() {
            return Err(LeaderboardError::Validation("prefix is required".to_string()));
        }
        let limit = match limit {
            0 => self.settings.default_search_limit,
            l => l.min(self.settings.max_search_limit),
        };

        // a single generation for every rank in the response
        let snapshot = self.snapshot.load();
        Ok(self
            .cache
            .search_by_prefix(prefix, limit)
            .into_iter()
            .map(|hit| UserResponse {
                rank: snapshot.rank_of(&hit.id),
                user_id: hit.id,
                username: hit.name,
                rating: hit.score,
            })
            .collect())
    }

    pub async fn create_user(&self, username: &str, score: i64) -> LeaderboardResult<UserResponse> {
        if username.trim().is_empty() {
            return Err(LeaderboardError::Validation("username is required".to_string()));
        }
        self.validate_score(score)?;

        let record = self.store.create(username, score).await?;
        self.cache.set(
            record.id.clone(),
            CacheEntry {
                name: record.username.clone(),
                score: record.score,
            },
        );
        self.scheduler.notify_update();

        Ok(UserResponse {
            rank: self.snapshot.get_rank(&record.id),
            user_id: record.id,
            username: record.username,
            rating: record.score,
        })
    }

    /// The returned rank is the one from the currently published snapshot,
    /// which may not reflect this update yet.
    pub async fn update_score(&self, id: &str, score: i64) -> LeaderboardResult<UserResponse> {
        self.validate_score(score)?;

        let record = self.store.update_score(id, score).await?;
        self.cache.set(
            record.id.clone(),
            CacheEntry {
                name: record.username.clone(),
                score: record.score,
            },
        );
        self.scheduler.notify_update();

        Ok(UserResponse {
            rank: self.snapshot.get_rank(&record.id),
            user_id: record.id,
            username: record.username,
            rating: record.score,
        })
    }

    /// Gives `count` random users a random valid score.
    pub async fn bulk_update_random(&self, count: usize) -> LeaderboardResult<BulkUpdateResult> {
        let (min, max) = (self.settings.min_score, self.settings.max_score);
        let plan = {
            let mut rng = rand::thread_rng();
            self.pick_random_ids(count, &mut rng)
                .into_iter()
                .map(|id| (id, rng.gen_range(min..=max)))
                .collect::<Vec<_>>()
        };
        Ok(self.apply_bulk(plan).await)
    }

    /// Moves `count` random users to the same score.
    pub async fn bulk_update_to_value(
        &self,
        count: usize,
        score: i64,
    ) -> LeaderboardResult<BulkUpdateResult> {
        self.validate_score(score)?;
        let plan = {
            let mut rng = rand::thread_rng();
            self.pick_random_ids(count, &mut rng)
                .into_iter()
                .map(|id| (id, score))
                .collect::<Vec<_>>()
        };
        Ok(self.apply_bulk(plan).await)
    }

    /// The published generation, for callers that need its metadata.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load()
    }

    pub fn force_rebuild(&self) {
        self.scheduler.force_rebuild();
    }

    pub fn stats(&self) -> ServiceStats {
        let (pending_updates, stats) = self.scheduler.counters();
        ServiceStats::new(
            self.cache.size(),
            pending_updates,
            stats,
            self.snapshot.generation(),
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn validate_score(&self, score: i64) -> LeaderboardResult<()> {
        let (min, max) = (self.settings.min_score, self.settings.max_score);
        if score < min || score > max {
            return Err(LeaderboardError::Validation(format!(
                "Score must be between {min} and {max}"
            )));
        }
        Ok(())
    }

    fn pick_random_ids(&self, count: usize, rng: &mut impl Rng) -> Vec<String> {
        let mut ids: Vec<String> = self.cache.snapshot_all().into_keys().collect();
        ids.shuffle(rng);
        ids.truncate(count);
        ids
    }

    /// Writes through one id at a time. Failed items are logged and left out
    /// of the count, the rest still land, and a single rebuild runs at the end.
    async fn apply_bulk(&self, plan: Vec<(String, i64)>) -> BulkUpdateResult {
        let started = Instant::now();
        let requested = plan.len();

        let mut updated = 0;
        for (id, score) in plan {
            match self.store.update_score(&id, score).await {
                Ok(record) => {
                    self.cache.set(
                        record.id,
                        CacheEntry {
                            name: record.username,
                            score: record.score,
                        },
                    );
                    updated += 1;
                }
                Err(e) => warn!("Skipping user {id} in bulk update. {e}"),
            }
        }
        self.scheduler.force_rebuild();

        let elapsed = started.elapsed();
        info!("Bulk update applied to {updated}/{requested} users in {elapsed:?}");
        BulkUpdateResult {
            updated,
            duration_ms: elapsed.as_millis(),
            updates_per_sec: match elapsed.as_secs_f64() {
                secs if secs > 0.0 => updated as f64 / secs,
                _ => updated as f64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, UserRecord};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Delegates to a `MemoryStore` but fails writes for chosen ids, or all
    /// writes when `fail_all` is set.
    struct FlakyStore {
        inner: MemoryStore,
        failing_ids: HashSet<String>,
        fail_all: bool,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn create(&self, username: &str, score: i64) -> LeaderboardResult<UserRecord> {
            if self.fail_all {
                return Err(LeaderboardError::Store("connection reset".to_string()));
            }
            self.inner.create(username, score).await
        }

        async fn update_score(&self, id: &str, score: i64) -> LeaderboardResult<UserRecord> {
            if self.fail_all || self.failing_ids.contains(id) {
                return Err(LeaderboardError::Store(format!("write to {id} timed out")));
            }
            self.inner.update_score(id, score).await
        }

        async fn scan(&self) -> LeaderboardResult<Vec<UserRecord>> {
            self.inner.scan().await
        }

        async fn count(&self) -> LeaderboardResult<usize> {
            self.inner.count().await
        }
    }

    fn records(n: usize) -> Vec<UserRecord> {
        (0..n)
            .map(|i| UserRecord {
                id: format!("id-{i:05}"),
                username: format!("Player_{i}"),
                score: 100 + (i as i64 % 4901),
            })
            .collect()
    }

    async fn service_with(records: Vec<UserRecord>) -> LeaderboardService {
        let store = Arc::new(MemoryStore::with_records(records));
        let service = LeaderboardService::new(store, Settings::default());
        service.initialize().await.unwrap();
        service
    }

    fn flaky(records: Vec<UserRecord>, failing_ids: &[&str], fail_all: bool) -> LeaderboardService {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::with_records(records),
            failing_ids: failing_ids.iter().map(|id| id.to_string()).collect(),
            fail_all,
        });
        LeaderboardService::new(store, Settings::default())
    }

    #[tokio::test]
    async fn initialize_warms_cache_and_publishes_a_snapshot() {
        let service = service_with(records(25)).await;
        let stats = service.stats();
        assert_eq!(stats.total_users, 25);
        assert_eq!(stats.rebuilds_triggered, 1);
        assert_eq!(stats.snapshot_generation, 1);
        assert_eq!(service.leaderboard(1, 100).total_users, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn created_user_is_ranked_after_the_debounce_window() {
        let service = service_with(records(3)).await;

        let created = service.create_user("Rahul", 5000).await.unwrap();
        assert_eq!(created.rank, 0);
        assert_eq!(service.user(&created.user_id).unwrap().rating, 5000);
        let stats = service.stats();
        assert_eq!((stats.pending_updates, stats.total_updates), (1, 1));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(service.user(&created.user_id).unwrap().rank, 1);
        assert_eq!(service.top(1)[0].username, "Rahul");
        let stats = service.stats();
        assert_eq!((stats.pending_updates, stats.rebuilds_triggered), (0, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn update_is_visible_in_cache_immediately_and_in_ranks_after_rebuild() {
        let service = service_with(records(10)).await;
        let before = service.user("id-00000").unwrap();
        assert_eq!(before.rank, 10);

        let response = service.update_score("id-00000", 5000).await.unwrap();
        assert_eq!(response.rating, 5000);
        assert_eq!(response.rank, 10);
        assert_eq!(service.user("id-00000").unwrap().rating, 5000);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(service.user("id-00000").unwrap().rank, 1);
    }

    #[tokio::test]
    async fn out_of_range_scores_are_rejected_without_side_effects() {
        let service = service_with(records(5)).await;
        let before = service.stats();

        for score in [99, 5001, -1] {
            let err = service.update_score("id-00001", score).await.unwrap_err();
            assert!(err.is_validation());
            let err = service.create_user("Nobody", score).await.unwrap_err();
            assert!(err.is_validation());
        }
        let err = service.bulk_update_to_value(3, 6000).await.unwrap_err();
        assert!(err.is_validation());

        assert_eq!(service.stats(), before);
        assert_eq!(service.user("id-00001").unwrap().rating, 101);
    }

    #[tokio::test]
    async fn blank_username_is_rejected() {
        let service = service_with(records(1)).await;
        let err = service.create_user("  ", 200).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(service.stats().total_users, 1);
    }

    #[tokio::test]
    async fn store_failures_leave_cache_and_scheduler_untouched() {
        let service = flaky(records(3), &["id-00002"], false);
        service.initialize().await.unwrap();

        let err = service.update_score("id-00002", 4000).await.unwrap_err();
        assert_eq!(err, LeaderboardError::Store("write to id-00002 timed out".to_string()));
        assert_eq!(service.user("id-00002").unwrap().rating, 102);
        assert_eq!(service.stats().total_updates, 0);

        let err = service.update_score("missing", 4000).await.unwrap_err();
        assert!(matches!(err, LeaderboardError::NotFound(_)));
        assert!(service.user("missing").is_none());
        assert_eq!(service.stats().pending_updates, 0);
    }

    #[tokio::test]
    async fn failed_create_does_not_reach_the_cache() {
        let service = flaky(records(2), &[], true);
        service.initialize().await.unwrap();

        let err = service.create_user("Ghost", 1000).await.unwrap_err();
        assert!(matches!(err, LeaderboardError::Store(_)));
        assert_eq!(service.stats().total_users, 2);
        assert!(service.search("ghost", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_update_of_fifty_out_of_ten_thousand_rebuilds_once() {
        let service = service_with(records(10_000)).await;
        let before = service.stats();

        let result = service.bulk_update_random(50).await.unwrap();

        let after = service.stats();
        assert_eq!(result.updated, 50);
        assert_eq!(after.rebuilds_triggered, before.rebuilds_triggered + 1);
        assert_eq!(after.total_users, 10_000);
        assert_eq!(after.pending_updates, 0);
        assert!(service
            .leaderboard(1, 100)
            .entries
            .iter()
            .all(|e| (100..=5000).contains(&e.rating)));
    }

    #[tokio::test]
    async fn bulk_update_skips_failed_items_and_still_rebuilds() {
        let service = flaky(records(4), &["id-00001", "id-00003"], false);
        service.initialize().await.unwrap();

        let result = service.bulk_update_to_value(10, 4242).await.unwrap();

        assert_eq!(result.updated, 2);
        assert_eq!(service.stats().rebuilds_triggered, 2);
        assert_eq!(service.user("id-00000").unwrap().rating, 4242);
        assert_eq!(service.user("id-00002").unwrap().rating, 4242);
        assert_eq!(service.user("id-00001").unwrap().rating, 101);
        assert_eq!(service.user("id-00000").unwrap().rank, 1);
        assert_eq!(service.user("id-00002").unwrap().rank, 1);
        assert_eq!(service.user("id-00003").unwrap().rank, 3);
    }

    #[tokio::test]
    async fn pagination_is_normalized() {
        let service = service_with(records(120)).await;

        let page = service.leaderboard(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.entries.len(), 50);
        assert_eq!(page.total_pages, 3);

        let page = service.leaderboard(2, 1000);
        assert_eq!(page.entries.len(), 50);
        assert_eq!(page.entries[0].rank, 51);

        let page = service.leaderboard(7, 30);
        assert!(page.entries.is_empty());
        assert_eq!((page.total_users, page.total_pages), (120, 4));
    }

    #[tokio::test]
    async fn top_is_defaulted_and_capped() {
        let service = service_with(records(200)).await;
        assert_eq!(service.top(0).len(), 10);
        assert_eq!(service.top(5).len(), 5);
        assert_eq!(service.top(1000).len(), 100);
    }

    #[tokio::test]
    async fn search_annotates_hits_with_ranks() {
        let service = service_with(vec![
            UserRecord {
                id: "a".into(),
                username: "Rahul".into(),
                score: 5000,
            },
            UserRecord {
                id: "b".into(),
                username: "rachel".into(),
                score: 4999,
            },
            UserRecord {
                id: "c".into(),
                username: "Priya".into(),
                score: 4998,
            },
        ])
        .await;

        let hits = service.search("RA", 0).unwrap();
        let summary: Vec<(&str, usize)> =
            hits.iter().map(|u| (u.username.as_str(), u.rank)).collect();
        assert_eq!(summary, vec![("Rahul", 1), ("rachel", 2)]);

        assert!(service.search("", 10).unwrap_err().is_validation());
        assert!(service.user("unknown-id").is_none());
    }
}
