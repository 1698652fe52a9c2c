use std::error::Error;
use std::fmt;
use tokio_cron_scheduler::JobSchedulerError;

/// Custom Error and Result types to unify errors from all sources.
pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardError {
    // Rejected input, nothing was mutated.
    Validation(String),
    NotFound(String),
    // Durable record store failure, propagated as-is to the caller.
    Store(String),
    Scheduler(String),
    Config(String),
    Render(String),
}

impl LeaderboardError {
    pub fn is_validation(&self) -> bool {
        matches!(self, LeaderboardError::Validation(_))
    }
}

impl fmt::Display for LeaderboardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LeaderboardError::Validation(s) => write!(f, "Validation Error: {}", s),
            LeaderboardError::NotFound(s) => write!(f, "Not Found: {}", s),
            LeaderboardError::Store(s) => write!(f, "Store Error: {}", s),
            LeaderboardError::Scheduler(s) => write!(f, "Scheduler Error: {}", s),
            LeaderboardError::Config(s) => write!(f, "Config Error: {}", s),
            LeaderboardError::Render(s) => write!(f, "Render Error: {}", s),
        }
    }
}

impl Error for LeaderboardError {}

impl From<JobSchedulerError> for LeaderboardError {
    fn from(error: JobSchedulerError) -> Self {
        LeaderboardError::Scheduler(error.to_string())
    }
}

impl From<figment::Error> for LeaderboardError {
    fn from(error: figment::Error) -> Self {
        LeaderboardError::Config(error.to_string())
    }
}

impl From<minijinja::Error> for LeaderboardError {
    fn from(error: minijinja::Error) -> Self {
        LeaderboardError::Render(error.to_string())
    }
}
