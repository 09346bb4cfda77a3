//! HTTP gateway handlers.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use dexwatch_core::{PollInterval, Snapshot};
use dexwatch_telemetry::Metrics;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::protocol::{views, ErrorResponse, HealthResponse, SnapshotResponse, TransactionsResponse};
use crate::server::HubState;

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// One-shot fetch that bypasses the cache and leaves the job table alone.
pub(crate) async fn transactions(
    State(state): State<HubState>,
    Path(raw): Path<String>,
) -> Response {
    let interval: PollInterval = match raw.parse() {
        Ok(interval) => interval,
        Err(e) => {
            warn!(interval = %raw, error = %e, "Rejected one-shot fetch");
            return error_response(StatusCode::BAD_REQUEST, "Invalid interval", e.to_string());
        }
    };

    let started = Instant::now();
    let result = state.monitor.fetcher().fetch().await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(records) => {
            Metrics::fetch_completed("oneshot", "ok", latency_ms);
            let snapshot = Snapshot::new(records);
            info!(
                interval = interval.minutes(),
                records = snapshot.len(),
                "Served one-shot fetch"
            );
            Json(TransactionsResponse {
                data: views(&snapshot),
                interval,
                next_update: Utc::now().timestamp_millis() + interval.as_millis(),
            })
            .into_response()
        }
        Err(e) => {
            Metrics::fetch_completed("oneshot", e.kind(), latency_ms);
            error!(error = %e, "One-shot fetch failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch transactions",
                e.to_string(),
            )
        }
    }
}

/// Cached snapshot and the intervals currently polling.
pub(crate) async fn snapshot(State(state): State<HubState>) -> Json<SnapshotResponse> {
    let snapshot = state.monitor.snapshot();
    Json(SnapshotResponse {
        data: views(&snapshot),
        fetched_at: snapshot.fetched_at(),
        active_intervals: state.monitor.active_intervals(),
    })
}

pub(crate) async fn metrics() -> Response {
    match Metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render metrics",
            e.to_string(),
        ),
    }
}

fn error_response(status: StatusCode, error: &str, details: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details,
        }),
    )
        .into_response()
}
