//! Trade records and snapshots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Placeholder used when the source omits a counterparty address.
pub const UNKNOWN_PARTY: &str = "Unknown";

/// One normalized trade.
///
/// Only raw values are kept here; human-readable amounts are rendered by
/// [`crate::display`] at the presentation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Transaction hash.
    pub id: String,
    /// Position of the entry in the batch it was fetched in.
    pub position: usize,
    /// Seller address.
    pub sender: String,
    /// Buyer address.
    pub recipient: String,
    /// Bought amount in token units.
    pub raw_amount: Decimal,
    /// Bought amount in USD, when the source reports it.
    pub amount_usd: Option<Decimal>,
    /// Bought currency symbol, when the source reports it.
    pub currency: Option<String>,
    /// Block number (batch position when the source omits it).
    pub block_height: u64,
    /// Block time.
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Identity key within one batch.
    ///
    /// The same hash can legitimately appear several times in one batch
    /// (multi-hop trades), so the position is part of the key.
    pub fn key(&self) -> String {
        format!("{}-{}", self.id, self.position)
    }
}

/// Ordered records produced by one completed fetch.
///
/// Snapshots are immutable and shared as `Arc<Snapshot>`; a newer fetch
/// replaces the whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    records: Vec<Record>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Snapshot before the first successful fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot stamped with the current time.
    ///
    /// Entries repeating an earlier `(id, position)` key are dropped.
    pub fn new(records: Vec<Record>) -> Self {
        Self::at(records, Utc::now())
    }

    /// Build a snapshot with an explicit fetch time.
    pub fn at(records: Vec<Record>, fetched_at: DateTime<Utc>) -> Self {
        let mut seen = HashSet::with_capacity(records.len());
        let total = records.len();
        let records: Vec<Record> = records
            .into_iter()
            .filter(|r| seen.insert((r.id.clone(), r.position)))
            .collect();

        if records.len() != total {
            warn!(
                dropped = total - records.len(),
                "Dropped records with duplicate (hash, position) keys"
            );
        }

        Self {
            records,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// When the fetch behind this snapshot completed (`None` if never fetched).
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
