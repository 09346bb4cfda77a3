//! Fetch error types.

use thiserror::Error;

/// Batch-level fetch failure.
///
/// Individual malformed entries are not errors; they are dropped during
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network or I/O failure, including non-success HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The source answered but reported a query-level failure.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The response did not have the expected structure.
    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

impl FetchError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Upstream(_) => "upstream",
            FetchError::Shape(_) => "shape",
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
