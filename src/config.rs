use crate::cli::Cli;
use crate::error::{LeaderboardError, LeaderboardResult};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

// All settings may be configured via environment variables. Example:
// MAX_SCORE="9000" would set max_score to 9000.
// Settings are built once in main and handed to the service; nothing reads
// them from a global.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    // Quiet period a burst of writes must leave before a debounced rebuild
    #[serde(default = "default_rebuild_delay_ms")]
    pub rebuild_delay_ms: u64,
    // Staleness ceiling
    #[serde(default = "default_max_rebuild_delay_ms")]
    pub max_rebuild_delay_ms: u64,
    // Cap every armed timer at the ceiling deadline, so a trickle of writes
    // cannot push a rebuild past it.
    #[serde(default = "default_staleness_fallback_timer")]
    pub staleness_fallback_timer: bool,
    #[serde(default = "default_min_score")]
    pub min_score: i64,
    #[serde(default = "default_max_score")]
    pub max_score: i64,
    #[serde(default = "default_page_limit")]
    pub default_page_limit: usize,
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: usize,
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,
    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,
    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: usize,
    // Users generated at startup when the record store is empty (0 disables)
    #[serde(default = "default_seed_users")]
    pub seed_users: usize,
    #[serde(default = "default_stats_report_schedule")]
    pub stats_report_schedule: String,
    // Synthetic write load, disabled unless a schedule is given
    pub bulk_update_schedule: Option<String>,
    #[serde(default = "default_bulk_update_count")]
    pub bulk_update_count: usize,
}

impl Settings {
    pub fn new(cli: Cli) -> LeaderboardResult<Self> {
        let figment = match Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            true => {
                println!("Found '{LOCAL_SETTINGS_YAML_FILE}' file, loading local configuration.");
                Figment::new().merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE))
            }
            false => Figment::new(),
        };
        Settings::from_figment(figment.merge(Env::raw()).merge(Serialized::defaults(cli)))
    }

    pub fn from_figment(figment: Figment) -> LeaderboardResult<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.rebuild_delay_ms)
    }

    pub fn max_rebuild_delay(&self) -> Duration {
        Duration::from_millis(self.max_rebuild_delay_ms)
    }

    fn validate(&self) -> LeaderboardResult<()> {
        if self.min_score > self.max_score {
            return Err(LeaderboardError::Config(format!(
                "min_score ({}) is greater than max_score ({})",
                self.min_score, self.max_score
            )));
        }
        if self.rebuild_delay_ms == 0 || self.max_rebuild_delay_ms == 0 {
            return Err(LeaderboardError::Config(
                "rebuild delays must be strictly positive".to_string(),
            ));
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(LeaderboardError::Config(
                "default_page_limit must be within [1, max_page_limit]".to_string(),
            ));
        }
        if self.default_top_n == 0 || self.default_top_n > self.max_top_n {
            return Err(LeaderboardError::Config(
                "default_top_n must be within [1, max_top_n]".to_string(),
            ));
        }
        if self.default_search_limit == 0 || self.default_search_limit > self.max_search_limit {
            return Err(LeaderboardError::Config(
                "default_search_limit must be within [1, max_search_limit]".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trace_level: default_trace_level(),
            rebuild_delay_ms: default_rebuild_delay_ms(),
            max_rebuild_delay_ms: default_max_rebuild_delay_ms(),
            staleness_fallback_timer: default_staleness_fallback_timer(),
            min_score: default_min_score(),
            max_score: default_max_score(),
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
            default_search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
            seed_users: default_seed_users(),
            stats_report_schedule: default_stats_report_schedule(),
            bulk_update_schedule: None,
            bulk_update_count: default_bulk_update_count(),
        }
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_rebuild_delay_ms() -> u64 {
    100
}

fn default_max_rebuild_delay_ms() -> u64 {
    500
}

fn default_staleness_fallback_timer() -> bool {
    true
}

fn default_min_score() -> i64 {
    100
}

fn default_max_score() -> i64 {
    5000
}

fn default_page_limit() -> usize {
    50
}

fn default_max_page_limit() -> usize {
    100
}

fn default_top_n() -> usize {
    10
}

fn default_max_top_n() -> usize {
    100
}

fn default_search_limit() -> usize {
    100
}

fn default_max_search_limit() -> usize {
    500
}

fn default_seed_users() -> usize {
    11_000
}

fn default_stats_report_schedule() -> String {
    "0/30 * * * * *".to_string()
}

fn default_bulk_update_count() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_figment_yields_defaults() {
        let settings = Settings::from_figment(Figment::new()).unwrap();
        assert_eq!(settings.rebuild_delay_ms, 100);
        assert_eq!(settings.max_rebuild_delay_ms, 500);
        assert_eq!((settings.min_score, settings.max_score), (100, 5000));
        assert!(settings.staleness_fallback_timer);
        assert!(settings.bulk_update_schedule.is_none());
        assert_eq!(settings.get_trace_level(), Level::INFO);
    }

    #[test]
    fn cli_overrides_are_merged_last() {
        let cli = Cli {
            rebuild_delay_ms: Some(25),
            staleness_fallback_timer: Some(false),
            ..Cli::default()
        };
        let figment = Figment::new()
            .merge(Serialized::default("rebuild_delay_ms", 300))
            .merge(Serialized::default("max_score", 9000))
            .merge(Serialized::defaults(cli));
        let settings = Settings::from_figment(figment).unwrap();
        assert_eq!(settings.rebuild_delay_ms, 25);
        assert_eq!(settings.max_score, 9000);
        assert!(!settings.staleness_fallback_timer);
    }

    #[test]
    fn yaml_then_env_then_cli_precedence() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_SETTINGS_YAML_FILE,
                "rebuild_delay_ms: 400\nmin_score: 200\nmax_score: 8000\n",
            )?;
            jail.set_env("REBUILD_DELAY_MS", "300");
            jail.set_env("MAX_SCORE", "9000");

            let cli = Cli {
                rebuild_delay_ms: Some(25),
                ..Cli::default()
            };
            let settings = Settings::new(cli).unwrap();
            assert_eq!(settings.rebuild_delay_ms, 25);
            assert_eq!(settings.max_score, 9000);
            assert_eq!(settings.min_score, 200);
            assert!(settings.staleness_fallback_timer);
            Ok(())
        });
    }

    #[test]
    fn inverted_score_range_is_rejected() {
        let figment = Figment::new()
            .merge(Serialized::default("min_score", 500))
            .merge(Serialized::default("max_score", 100));
        let err = Settings::from_figment(figment).unwrap_err();
        assert!(matches!(err, LeaderboardError::Config(_)));
    }

    #[test]
    fn unknown_trace_level_falls_back_to_info() {
        assert_eq!(get_trace_level("DEBUG"), Level::DEBUG);
        assert_eq!(get_trace_level("verbose"), Level::INFO);
    }
}
