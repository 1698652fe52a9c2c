use crate::config::Settings;
use crate::core::snapshot::RankingSnapshot;
use crate::storage::EntryCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RebuildTrigger {
    // quiet period elapsed (or the capped deadline was reached)
    Debounced,
    // a write found the snapshot older than the staleness ceiling
    Ceiling,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SchedulerPhase {
    Idle,
    Pending,
    Rebuilding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_updates: u64,
    pub rebuilds_triggered: u64,
    pub average_updates_per_rebuild: f64,
}

#[derive(Debug, Clone)]
pub struct DebounceSettings {
    pub quiet_period: Duration,
    pub max_delay: Duration,
    // When set, an armed timer never sleeps past `last rebuild + max_delay`.
    pub fallback_timer: bool,
}

impl From<&Settings> for DebounceSettings {
    fn from(settings: &Settings) -> Self {
        DebounceSettings {
            quiet_period: settings.quiet_period(),
            max_delay: settings.max_rebuild_delay(),
            fallback_timer: settings.staleness_fallback_timer,
        }
    }
}

struct SchedulerState {
    pending_update_count: u64,
    last_rebuild_at: Instant,
    timer: Option<JoinHandle<()>>,
    // bumped on every arm/cancel, a timer only fires if it still matches
    timer_generation: u64,
    rebuilding: bool,
    stats: Stats,
}

impl SchedulerState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_generation += 1;
    }

    /// Takes ownership of every pending update for the rebuild about to run.
    fn claim_pending(&mut self) -> u64 {
        self.cancel_timer();
        self.last_rebuild_at = Instant::now();
        std::mem::take(&mut self.pending_update_count)
    }
}

struct Inner {
    cache: EntryCache,
    snapshot: Arc<RankingSnapshot>,
    settings: DebounceSettings,
    state: Mutex<SchedulerState>,
    // serializes rebuild execution, held for the whole scan + sort + swap
    rebuild_lock: Mutex<()>,
}

/// Turns a stream of write notifications into a bounded number of snapshot
/// rebuilds.
///
/// Every write restarts a quiet-period timer; the rebuild runs once writes
/// stop for that long. If the published snapshot is already older than the
/// staleness ceiling when a write comes in, that write rebuilds on the spot.
///
/// Arming a timer spawns a tokio task, so `notify_update` must be called from
/// within a runtime.
#[derive(Clone)]
pub struct RebuildScheduler {
    inner: Arc<Inner>,
}

impl RebuildScheduler {
    pub fn new(
        cache: EntryCache,
        snapshot: Arc<RankingSnapshot>,
        settings: DebounceSettings,
    ) -> RebuildScheduler {
        RebuildScheduler {
            inner: Arc::new(Inner {
                cache,
                snapshot,
                settings,
                state: Mutex::new(SchedulerState {
                    pending_update_count: 0,
                    last_rebuild_at: Instant::now(),
                    timer: None,
                    timer_generation: 0,
                    rebuilding: false,
                    stats: Stats::default(),
                }),
                rebuild_lock: Mutex::new(()),
            }),
        }
    }

    pub fn notify_update(&self) {
        let ceiling_batch = {
            let mut state = self.inner.state.lock();
            state.pending_update_count += 1;
            state.stats.total_updates += 1;

            if state.last_rebuild_at.elapsed() >= self.inner.settings.max_delay
                && state.pending_update_count > 0
            {
                Some(state.claim_pending())
            } else {
                self.arm_timer(&mut state);
                None
            }
        };

        if let Some(batched) = ceiling_batch {
            self.run_rebuild(RebuildTrigger::Ceiling, batched);
        }
    }

    /// Rebuilds right away, dropping any armed timer.
    pub fn force_rebuild(&self) {
        let batched = self.inner.state.lock().claim_pending();
        self.run_rebuild(RebuildTrigger::Forced, batched);
    }

    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        state.cancel_timer();
        debug!(
            "Rebuild scheduler stopped with {} pending updates",
            state.pending_update_count
        );
    }

    pub fn stats(&self) -> Stats {
        self.inner.state.lock().stats
    }

    pub fn pending_updates(&self) -> u64 {
        self.inner.state.lock().pending_update_count
    }

    /// Pending update count and stats read under one lock.
    pub fn counters(&self) -> (u64, Stats) {
        let state = self.inner.state.lock();
        (state.pending_update_count, state.stats)
    }

    pub fn phase(&self) -> SchedulerPhase {
        let state = self.inner.state.lock();
        match (state.rebuilding, state.timer.is_some()) {
            (true, _) => SchedulerPhase::Rebuilding,
            (false, true) => SchedulerPhase::Pending,
            (false, false) => SchedulerPhase::Idle,
        }
    }

    fn arm_timer(&self, state: &mut SchedulerState) {
        state.cancel_timer();
        let generation = state.timer_generation;

        let settings = &self.inner.settings;
        let mut deadline = Instant::now() + settings.quiet_period;
        if settings.fallback_timer {
            deadline = deadline.min(state.last_rebuild_at + settings.max_delay);
        }

        let scheduler = self.clone();
        state.timer = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            scheduler.fire(generation);
        }));
    }

    fn fire(&self, generation: u64) {
        let batched = {
            let mut state = self.inner.state.lock();
            if state.timer_generation != generation {
                // superseded by a newer write, a forced rebuild or shutdown
                return;
            }
            // we are the running timer, drop the handle without aborting ourselves
            state.timer = None;
            if state.pending_update_count == 0 {
                return;
            }
            state.claim_pending()
        };
        self.run_rebuild(RebuildTrigger::Debounced, batched);
    }

    fn run_rebuild(&self, trigger: RebuildTrigger, batched: u64) {
        let _running = self.inner.rebuild_lock.lock();
        self.inner.state.lock().rebuilding = true;

        let started = Instant::now();
        let all_entries = self.inner.cache.snapshot_all();
        let snapshot = self.inner.snapshot.rebuild(all_entries);

        let mut state = self.inner.state.lock();
        state.rebuilding = false;
        let stats = &mut state.stats;
        stats.rebuilds_triggered += 1;
        stats.average_updates_per_rebuild =
            stats.total_updates as f64 / stats.rebuilds_triggered as f64;

        info!(
            "Snapshot #{} rebuilt ({trigger}, batched {batched} updates, {} entries) in {:?}",
            snapshot.generation,
            snapshot.len(),
            started.elapsed()
        );
    }
}
