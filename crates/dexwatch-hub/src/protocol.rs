//! Wire types for the WebSocket protocol and the HTTP gateway.
//!
//! Every WebSocket frame is a JSON object `{"event": <name>, "data": <payload>}`.

use chrono::{DateTime, Utc};
use dexwatch_core::display::display_amount;
use dexwatch_core::{PollInterval, Record, Snapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HubResult;

/// One record as presented to subscribers.
///
/// Numeric fields are carried raw; `displayAmount` is the only formatted
/// rendering and is derived here, at the presentation boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    /// Stable row key (`"<id>-<position>"`).
    pub key: String,
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub raw_amount: Decimal,
    pub amount_usd: Option<Decimal>,
    pub currency: Option<String>,
    pub display_amount: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            key: record.key(),
            id: record.id.clone(),
            sender: record.sender.clone(),
            recipient: record.recipient.clone(),
            raw_amount: record.raw_amount,
            amount_usd: record.amount_usd,
            currency: record.currency.clone(),
            display_amount: display_amount(record),
            block_height: record.block_height,
            timestamp: record.timestamp,
        }
    }
}

/// Render a snapshot in order.
pub fn views(snapshot: &Snapshot) -> Vec<RecordView> {
    snapshot.records().iter().map(RecordView::from).collect()
}

/// Messages sent to a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Current snapshot, sent once on connect.
    #[serde(rename = "initial")]
    Initial(Vec<RecordView>),
    /// New snapshot, sent to every session.
    #[serde(rename = "transactions")]
    Transactions(Vec<RecordView>),
    /// Fetch failure (broadcast) or rejected request (requester only).
    #[serde(rename = "error")]
    Error { message: String },
    /// Acknowledges an interval change to the requester.
    #[serde(rename = "intervalChanged")]
    IntervalChanged(PollInterval),
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Event name on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Initial(_) => "initial",
            Self::Transactions(_) => "transactions",
            Self::Error { .. } => "error",
            Self::IntervalChanged(_) => "intervalChanged",
        }
    }

    pub fn to_json(&self) -> HubResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages received from a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Requested interval, validated by the receiver.
    #[serde(rename = "changeInterval")]
    ChangeInterval(Value),
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /api/transactions/{interval}` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub data: Vec<RecordView>,
    pub interval: PollInterval,
    /// Unix milliseconds of the next expected refresh at this interval.
    pub next_update: i64,
}

/// `GET /api/snapshot` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub data: Vec<RecordView>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub active_intervals: Vec<PollInterval>,
}

/// Error body for the HTTP gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}
