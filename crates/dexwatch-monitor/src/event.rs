//! Monitor notifications.

use std::fmt;
use std::sync::Arc;

use dexwatch_core::{PollInterval, Snapshot};
use dexwatch_fetch::FetchError;

/// Notification emitted by the monitor.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// First successful fetch at initialization.
    Initial(Arc<Snapshot>),
    /// Snapshot replaced by a start or tick fetch.
    Update(Arc<Snapshot>),
    /// A fetch failed; the previous snapshot is retained.
    Error(FetchError),
}

impl MonitorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::Initial(_) => "initial",
            MonitorEvent::Update(_) => "update",
            MonitorEvent::Error(_) => "error",
        }
    }
}

/// Why a fetch ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchCause {
    Initial,
    /// Eager fetch when a job is started.
    Start(PollInterval),
    /// Scheduled tick of a job.
    Tick(PollInterval),
}

impl FetchCause {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            FetchCause::Initial => "initial",
            FetchCause::Start(_) => "start",
            FetchCause::Tick(_) => "tick",
        }
    }
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::Initial => write!(f, "initial"),
            FetchCause::Start(i) => write!(f, "start({i})"),
            FetchCause::Tick(i) => write!(f, "tick({i})"),
        }
    }
}
