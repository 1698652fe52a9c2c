use tokio_cron_scheduler::{Job, JobScheduler};

use minijinja::context;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::core::templates::ReportTemplate;
use crate::error::{LeaderboardError, LeaderboardResult};
use crate::models::{BulkUpdateResult, ServiceStats};
use crate::service::LeaderboardService;

/// Periodic background jobs running next to the service.
///
/// Snapshot rebuilds are not driven from here, they are debounced by the
/// service's own rebuild scheduler.
pub struct Jobs {
    scheduler: JobScheduler,
    service: Arc<LeaderboardService>,
}

pub enum JobProcess<'schedule> {
    ReportStats(&'schedule str),
    // synthetic write load: (schedule, number of users updated per run)
    BulkUpdateRandom(&'schedule str, usize),
}

impl Jobs {
    pub async fn new(service: Arc<LeaderboardService>) -> LeaderboardResult<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Jobs { scheduler, service })
    }

    pub async fn add_job(&self, job_process: JobProcess<'_>) -> LeaderboardResult<uuid::Uuid> {
        let job = match job_process {
            JobProcess::ReportStats(schedule) => report_stats_job(schedule, self.service.clone())?,
            JobProcess::BulkUpdateRandom(schedule, count) => {
                bulk_update_random_job(schedule, count, self.service.clone())?
            }
        };
        Ok(self.scheduler.add(job).await?)
    }

    pub async fn start(&self) -> LeaderboardResult<()> {
        Ok(self.scheduler.start().await?)
    }

    pub async fn shutdown(&self) -> LeaderboardResult<()> {
        let mut scheduler = self.scheduler.clone();
        Ok(scheduler.shutdown().await?)
    }
}

pub fn render_stats(stats: &ServiceStats) -> LeaderboardResult<String> {
    Ok(ReportTemplate::Stats.get()?.render(context! {
        total_users => stats.total_users,
        pending_updates => stats.pending_updates,
        total_updates => stats.total_updates,
        rebuilds_triggered => stats.rebuilds_triggered,
        avg_updates_per_rebuild => stats.avg_updates_per_rebuild,
    })?)
}

pub fn render_bulk_update(result: &BulkUpdateResult) -> LeaderboardResult<String> {
    Ok(ReportTemplate::BulkUpdate.get()?.render(context! {
        updated => result.updated,
        duration_ms => result.duration_ms as u64,
        updates_per_sec => result.updates_per_sec,
    })?)
}

//////////////////
// Jobs definition
//////////////////

fn report_stats_job(schedule: &str, service: Arc<LeaderboardService>) -> LeaderboardResult<Job> {
    let job = Job::new_async(schedule, move |uuid, mut l| {
        let service = service.clone();
        Box::pin(async move {
            match render_stats(&service.stats()) {
                Ok(report) => info!("{report}"),
                Err(e) => error!("{e}"),
            };

            // Query the next execution time for this job
            let next_tick = l.next_tick_for_job(uuid).await;
            match next_tick {
                Ok(Some(ts)) => debug!("Next stats report at {:?}", ts),
                _ => error!("Could not get next tick for stats report job"),
            }
        })
    })?;
    Ok(job)
}

fn bulk_update_random_job(
    schedule: &str,
    count: usize,
    service: Arc<LeaderboardService>,
) -> LeaderboardResult<Job> {
    let job = Job::new_async(schedule, move |_uuid, _l| {
        let service = service.clone();
        Box::pin(async move {
            let report = service
                .bulk_update_random(count)
                .await
                .and_then(|result| render_bulk_update(&result));
            match report {
                Ok(report) => info!("{report}"),
                Err(e) => {
                    let error =
                        LeaderboardError::Store(format!("Scheduled bulk update failed. {e}"));
                    error!("{error}");
                }
            };
        })
    })?;
    Ok(job)
}
