use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the per-session result file.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to open result file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write result row: {0}")]
    Write(#[from] csv::Error),
    #[error("failed to sync result file: {0}")]
    Sync(#[from] std::io::Error),
    #[error("result file is already closed")]
    Closed,
}

/// Errors raised while reading the trial list.
#[derive(Debug, Error)]
pub enum TrialListError {
    #[error("failed to read trial list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Invalid timing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is out of range (0 to 3600 seconds), got {value}")]
    InvalidDuration { field: &'static str, value: f64 },
    #[error("poll interval must be at least 1 ms")]
    ZeroPollInterval,
}

/// Unrecoverable failures that end a session.
///
/// A response timeout is not represented here: it is a normal trial outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("display failure: {0}")]
    Display(String),
    #[error("input source failure: {0}")]
    Input(String),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("session aborted by operator")]
    Aborted,
}

impl SessionError {
    pub fn display(err: impl std::fmt::Display) -> Self {
        SessionError::Display(err.to_string())
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
