//! Polling cadence.
//!
//! A `PollInterval` is validated once at construction; everything downstream
//! (the monitor's job table, the hub's tracked interval, the gateway response)
//! can rely on it being a positive whole number of minutes.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Positive polling interval in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct PollInterval(NonZeroU32);

impl PollInterval {
    /// One minute, the default cadence.
    pub const ONE_MINUTE: Self = Self(NonZeroU32::MIN);

    /// Create from a signed minute count.
    pub fn new(minutes: i64) -> Result<Self> {
        if minutes < 1 {
            return Err(CoreError::InvalidInterval(format!(
                "{minutes} is not a positive number of minutes"
            )));
        }
        let minutes = u32::try_from(minutes)
            .map_err(|_| CoreError::InvalidInterval(format!("{minutes} minutes is too large")))?;
        NonZeroU32::new(minutes)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidInterval("0 is not a positive number of minutes".into()))
    }

    /// Validate an interval received as a loosely typed JSON value.
    ///
    /// Accepts integers, integral floats (`5.0`) and numeric strings (`"5"`).
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Self::new(i);
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Self::new(f as i64)
                    }
                    _ => Err(CoreError::InvalidInterval(format!(
                        "{n} is not a whole number of minutes"
                    ))),
                }
            }
            Value::String(s) => s.parse(),
            other => Err(CoreError::InvalidInterval(format!(
                "expected a positive integer, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Interval in minutes.
    pub fn minutes(&self) -> u32 {
        self.0.get()
    }

    /// Interval as a schedule period.
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0.get()) * 60)
    }

    /// Interval in milliseconds.
    pub fn as_millis(&self) -> i64 {
        i64::from(self.0.get()) * 60_000
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self::ONE_MINUTE
    }
}

impl TryFrom<i64> for PollInterval {
    type Error = CoreError;

    fn try_from(minutes: i64) -> Result<Self> {
        Self::new(minutes)
    }
}

impl From<PollInterval> for u32 {
    fn from(interval: PollInterval) -> Self {
        interval.minutes()
    }
}

impl FromStr for PollInterval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let minutes: i64 = trimmed
            .parse()
            .map_err(|_| CoreError::InvalidInterval(format!("{trimmed:?} is not an integer")))?;
        Self::new(minutes)
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}
