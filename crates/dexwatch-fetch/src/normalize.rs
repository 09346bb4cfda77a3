//! Raw response normalization.
//!
//! Converts the GraphQL response body into `Record`s. Entries missing a
//! required field (hash, amount, block time) are dropped with a warning and
//! the rest of the batch is kept; only batch-level problems become errors.

use chrono::{DateTime, Utc};
use dexwatch_core::record::UNKNOWN_PARTY;
use dexwatch_core::Record;
use dexwatch_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};

/// JSON pointer to the trade list inside the response.
const TRADES_POINTER: &str = "/data/EVM/DEXTrades";

/// Raw trade entry (`DEXTrades[n]`). Every field is optional; validation
/// happens in [`normalize_entry`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTrade {
    #[serde(rename = "Block")]
    block: Option<RawBlock>,
    #[serde(rename = "Transaction")]
    transaction: Option<RawTransaction>,
    #[serde(rename = "Trade")]
    trade: Option<RawTradeSides>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlock {
    #[serde(rename = "Time")]
    time: Option<String>,
    #[serde(rename = "Number")]
    number: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTransaction {
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTradeSides {
    #[serde(rename = "Buy")]
    buy: Option<RawBuy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBuy {
    #[serde(rename = "Amount")]
    amount: Option<Value>,
    #[serde(rename = "AmountInUSD")]
    amount_in_usd: Option<Value>,
    #[serde(rename = "Buyer")]
    buyer: Option<String>,
    #[serde(rename = "Seller")]
    seller: Option<String>,
    #[serde(rename = "Currency")]
    currency: Option<RawCurrency>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCurrency {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
}

/// Parse a raw response body.
pub fn parse_response(body: &str) -> FetchResult<Vec<Record>> {
    if body.trim().is_empty() {
        return Err(FetchError::Shape("empty response from upstream".to_string()));
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Shape(format!("response is not valid JSON: {e}")))?;
    parse_value(&value)
}

/// Parse an already-decoded response.
///
/// A missing trade list is an empty batch; a trade list that is not an
/// array is a shape error.
pub fn parse_value(value: &Value) -> FetchResult<Vec<Record>> {
    if !value.is_object() {
        return Err(FetchError::Shape("response is not a JSON object".to_string()));
    }

    if let Some(errors) = value.get("errors").filter(|e| !e.is_null()) {
        let message = errors
            .as_array()
            .and_then(|list| list.first())
            .and_then(|first| first.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error");
        warn!(errors = %errors, "Upstream reported query errors");
        return Err(FetchError::Upstream(message.to_string()));
    }

    match value.pointer(TRADES_POINTER) {
        None | Some(Value::Null) => {
            debug!("Response carries no trade list, treating as empty batch");
            Ok(Vec::new())
        }
        Some(Value::Array(entries)) => Ok(normalize_entries(entries)),
        Some(other) => Err(FetchError::Shape(format!(
            "DEXTrades is not an array: {other}"
        ))),
    }
}

/// Normalize a list of raw entries, dropping incomplete ones.
pub fn normalize_entries(entries: &[Value]) -> Vec<Record> {
    let records: Vec<Record> = entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| match normalize_entry(position, entry) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!(position, reason = %reason, entry = %entry, "Dropping incomplete trade entry");
                None
            }
        })
        .collect();

    let dropped = entries.len() - records.len();
    if dropped > 0 {
        Metrics::records_dropped(dropped as u64);
    }
    records
}

/// Normalize one entry at `position` in its batch.
pub fn normalize_entry(position: usize, entry: &Value) -> Result<Record, String> {
    let raw: RawTrade =
        serde_json::from_value(entry.clone()).map_err(|e| format!("malformed entry: {e}"))?;

    let block = raw.block.unwrap_or_default();
    let buy = raw.trade.and_then(|t| t.buy).unwrap_or_default();

    let id = raw
        .transaction
        .and_then(|t| t.hash)
        .filter(|h| !h.is_empty())
        .ok_or("missing transaction hash")?;

    let raw_amount = buy
        .amount
        .as_ref()
        .and_then(decimal_from)
        .ok_or("missing or invalid amount")?;

    let timestamp = block
        .time
        .as_deref()
        .and_then(parse_time)
        .ok_or("missing or invalid block time")?;

    let block_height = block
        .number
        .as_ref()
        .and_then(u64_from)
        .unwrap_or(position as u64);

    Ok(Record {
        id,
        position,
        sender: party_or_unknown(buy.seller),
        recipient: party_or_unknown(buy.buyer),
        raw_amount,
        amount_usd: buy.amount_in_usd.as_ref().and_then(decimal_from),
        currency: buy
            .currency
            .and_then(|c| c.symbol)
            .filter(|s| !s.is_empty()),
        block_height,
        timestamp,
    })
}

fn party_or_unknown(address: Option<String>) -> String {
    address
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_PARTY.to_string())
}

/// The source sends numbers either as JSON numbers or as strings.
fn decimal_from(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

fn u64_from(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
