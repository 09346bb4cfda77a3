//! Structured logging initialization and process-scope failure policy.

use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Pretty logs; panics are logged and the process keeps running.
    #[default]
    Development,
    /// JSON logs; any panic terminates the process.
    Production,
}

impl RunMode {
    pub fn is_production(&self) -> bool {
        *self == RunMode::Production
    }
}

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over `default_filter`. Production mode emits
/// JSON; other modes use the pretty formatter.
pub fn init_logging(mode: RunMode, default_filter: &str) -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log filter: {e}")))?;

    let result = if mode.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Install the process-wide panic hook.
///
/// Every panic is logged through tracing. In production the process exits
/// with status 1; otherwise the panicking task ends and the process keeps
/// serving.
pub fn install_panic_hook(mode: RunMode) {
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        error!(%location, %message, ?mode, "Uncaught panic");

        if mode.is_production() {
            std::process::exit(1);
        }
    }));
}
