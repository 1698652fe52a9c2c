use clap::Parser;
use serde::Serialize;

/// Command line overrides, merged on top of the yaml file and environment.
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "leaderboard", about = "In-memory ranked leaderboard engine")]
pub struct Cli {
    /// Maximum tracing level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_level: Option<String>,

    /// Number of users generated when the record store starts empty
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_users: Option<usize>,

    /// Quiet period before a debounced rebuild, in milliseconds
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuild_delay_ms: Option<u64>,

    /// Staleness ceiling, in milliseconds
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rebuild_delay_ms: Option<u64>,

    /// Cron schedule of the synthetic bulk update job
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_update_schedule: Option<String>,

    /// Whether armed timers are capped by the staleness ceiling deadline
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staleness_fallback_timer: Option<bool>,
}
