//! Polling scheduler and snapshot cache for dexwatch.
//!
//! The [`Monitor`] owns one cached [`Snapshot`](dexwatch_core::Snapshot) and a
//! table of polling jobs keyed by interval. Every completed fetch replaces the
//! snapshot wholesale and is announced through a [`Subject`].
//!
//! # Architecture
//!
//! ```text
//!   start(i) / stop(i)            subscribe(handler)
//!          │                              │
//!          ▼                              ▼
//!  ┌──────────────────┐   notify   ┌─────────────────┐
//!  │ Monitor          │──────────▶│ Subject<Event>  │──▶ hub, tests, ...
//!  │  jobs: {i → job} │            └─────────────────┘
//!  │  snapshot: Arc<> │
//!  └────────┬─────────┘
//!           │ fetch()
//!           ▼
//!     dyn Fetcher
//! ```

mod event;
mod monitor;
mod subject;

pub use event::{FetchCause, MonitorEvent};
pub use monitor::{Monitor, PendingStart, StartStatus};
pub use subject::{Subject, SubscriptionId};
