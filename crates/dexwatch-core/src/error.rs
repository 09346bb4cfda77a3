//! Error types for dexwatch-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
