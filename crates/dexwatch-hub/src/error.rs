//! Hub error types.

use dexwatch_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Interval(#[from] CoreError),

    #[error("Monitor is shut down")]
    MonitorStopped,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket send failed: {0}")]
    Send(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HubResult<T> = Result<T, HubError>;
