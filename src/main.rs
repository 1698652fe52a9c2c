use leaderboard_engine::cli::Cli;
use leaderboard_engine::config::Settings;
use leaderboard_engine::core::{display, templates::ReportTemplate};
use leaderboard_engine::scheduler::{render_stats, JobProcess, Jobs};
use leaderboard_engine::seed::seed_if_empty;
use leaderboard_engine::service::LeaderboardService;
use leaderboard_engine::store::{MemoryStore, RecordStore};

use clap::Parser;
use minijinja::context;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::new(Cli::parse())?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    seed_if_empty(
        store.as_ref(),
        settings.seed_users,
        settings.min_score,
        settings.max_score,
    )
    .await?;

    info!("Initializing leaderboard service.");
    let service = Arc::new(LeaderboardService::new(store, settings.clone()));
    service.initialize().await?;

    let snapshot = service.current_snapshot();
    let top = service.top(settings.default_top_n);
    let standings = ReportTemplate::Standings.get()?.render(context! {
        count => top.len(),
        total => snapshot.len(),
        generation => snapshot.generation,
        built_at => snapshot.built_at.format("%d/%m/%Y %H:%M:%S").to_string(),
        board => display::board(&top),
    })?;
    info!("\n{standings}");
    info!("{}", render_stats(&service.stats())?);

    let jobs = Jobs::new(service.clone()).await?;
    let mut processes = vec![JobProcess::ReportStats(&settings.stats_report_schedule)];
    if let Some(schedule) = &settings.bulk_update_schedule {
        processes.push(JobProcess::BulkUpdateRandom(schedule, settings.bulk_update_count));
    }
    for process in processes {
        jobs.add_job(process).await?;
    }

    info!("Starting jobs scheduler.");
    jobs.start().await?;

    tokio::signal::ctrl_c().await?;

    jobs.shutdown().await?;
    service.shutdown();
    Ok(())
}
