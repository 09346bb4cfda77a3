//! Prometheus metrics for dexwatch.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Completed fetches.
/// Labels: cause (initial/start/tick/oneshot), outcome (ok/transport/upstream/shape)
pub static FETCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexwatch_fetch_total",
        "Completed upstream fetches",
        &["cause", "outcome"]
    )
    .unwrap()
});

/// Fetch latency in milliseconds.
pub static FETCH_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dexwatch_fetch_latency_ms",
        "Upstream fetch latency in milliseconds",
        &["cause"],
        vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0]
    )
    .unwrap()
});

/// Entries dropped during normalization.
pub static RECORDS_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dexwatch_records_dropped_total",
        "Incomplete upstream entries dropped during normalization"
    )
    .unwrap()
});

/// Records in the current cached snapshot.
pub static SNAPSHOT_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dexwatch_snapshot_records",
        "Records in the current cached snapshot"
    )
    .unwrap()
});

/// Active polling jobs.
pub static ACTIVE_JOBS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dexwatch_active_jobs", "Active polling jobs").unwrap()
});

/// Connected subscriber sessions.
pub static SESSIONS_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dexwatch_sessions_connected",
        "Connected subscriber sessions"
    )
    .unwrap()
});

/// Messages fanned out to sessions.
/// Labels: event (transactions/error)
pub static BROADCAST_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexwatch_broadcast_total",
        "Messages fanned out to all sessions",
        &["event"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a completed fetch.
    pub fn fetch_completed(cause: &str, outcome: &str, latency_ms: f64) {
        FETCH_TOTAL.with_label_values(&[cause, outcome]).inc();
        FETCH_LATENCY_MS
            .with_label_values(&[cause])
            .observe(latency_ms);
    }

    /// Record entries dropped during normalization.
    pub fn records_dropped(count: u64) {
        RECORDS_DROPPED_TOTAL.inc_by(count);
    }

    /// Set the cached snapshot size.
    pub fn snapshot_size(records: usize) {
        SNAPSHOT_RECORDS.set(records as i64);
    }

    /// Set the number of active polling jobs.
    pub fn active_jobs(count: usize) {
        ACTIVE_JOBS.set(count as i64);
    }

    /// Record a session connecting.
    pub fn session_connected() {
        SESSIONS_CONNECTED.inc();
    }

    /// Record a session disconnecting.
    pub fn session_disconnected() {
        SESSIONS_CONNECTED.dec();
    }

    /// Record a fan-out message.
    pub fn broadcast(event: &str) {
        BROADCAST_TOTAL.with_label_values(&[event]).inc();
    }

    /// Render the default registry in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_metrics() {
        Metrics::fetch_completed("tick", "ok", 12.0);
        Metrics::records_dropped(2);
        Metrics::active_jobs(1);

        let text = Metrics::render().unwrap();
        assert!(text.contains("dexwatch_fetch_total"));
        assert!(text.contains("dexwatch_records_dropped_total"));
        assert!(text.contains("dexwatch_active_jobs"));
    }
}
