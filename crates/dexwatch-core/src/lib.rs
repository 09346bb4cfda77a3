//! Core domain types for the dexwatch trade monitor.
//!
//! This crate provides the types shared by every other crate:
//! - `Record`: one normalized DEX trade
//! - `Snapshot`: the immutable, ordered batch produced by one completed fetch
//! - `PollInterval`: a validated, positive polling cadence in minutes
//! - `display`: presentation-boundary formatting of raw numeric fields

pub mod display;
pub mod error;
pub mod interval;
pub mod record;

pub use error::{CoreError, Result};
pub use interval::PollInterval;
pub use record::{Record, Snapshot};
