//! Prometheus metrics and structured logging for dexwatch.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Process-scope panic policy per run mode
//! - Prometheus metrics for fetches, jobs and subscriber sessions

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, install_panic_hook, RunMode};
pub use metrics::Metrics;
