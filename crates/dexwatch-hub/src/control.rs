//! Interval changes requested by sessions.

use dexwatch_core::PollInterval;
use dexwatch_monitor::{Monitor, StartStatus};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{HubError, HubResult};

/// Tracks the interval the hub last started and swaps it on request.
///
/// The async mutex serializes changes, so two sessions racing each other
/// always leave exactly one hub-owned job running. The lock only covers the
/// stop/start bookkeeping: the new job's eager fetch runs on its own task and
/// its result reaches sessions as a regular `transactions` broadcast.
pub struct IntervalControl {
    monitor: Monitor,
    active: Mutex<Option<PollInterval>>,
}

impl IntervalControl {
    pub fn new(monitor: Monitor, active: Option<PollInterval>) -> Self {
        Self {
            monitor,
            active: Mutex::new(active),
        }
    }

    /// Interval the hub currently owns.
    pub async fn current(&self) -> Option<PollInterval> {
        *self.active.lock().await
    }

    /// Validate `requested`, then stop the tracked interval and start the new
    /// one. Returns as soon as the job is scheduled.
    ///
    /// An invalid request leaves the monitor untouched. Fails with
    /// [`HubError::MonitorStopped`] once the monitor has shut down.
    pub async fn change(&self, requested: &Value) -> HubResult<PollInterval> {
        let interval = PollInterval::from_json(requested)?;

        let mut active = self.active.lock().await;
        let previous = *active;
        if let Some(current) = previous {
            self.monitor.stop(current);
        }
        // Dropping the pending start leaves the eager fetch running.
        let pending = self.monitor.begin_start(interval);
        if pending.status() == StartStatus::ShutDown {
            *active = None;
            warn!(to = interval.minutes(), "Interval change refused, monitor is shut down");
            return Err(HubError::MonitorStopped);
        }
        *active = Some(interval);
        drop(active);

        info!(
            from = ?previous.map(|i| i.minutes()),
            to = interval.minutes(),
            "Monitoring interval changed"
        );
        Ok(interval)
    }
}
