//! dexwatch-hub - Broadcast hub for live DEX trade snapshots.
//!
//! Bridges [`Monitor`](dexwatch_monitor::Monitor) notifications to every
//! connected WebSocket session and routes per-session interval changes back
//! into the monitor. Also serves the one-shot HTTP gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        dexwatch process                        │
//! │                                                                │
//! │  ┌──────────────┐  MonitorEvent   ┌──────────────────────────┐ │
//! │  │   Monitor    │────(relay)────▶│ broadcast::Sender<String> │ │
//! │  └──────┬───────┘                 └────────────┬─────────────┘ │
//! │         │ stop/start                           │ one receiver  │
//! │  ┌──────┴───────┐                              ▼ per session   │
//! │  │IntervalControl│◀── changeInterval ── WebSocket sessions     │
//! │  └──────────────┘                                              │
//! │                                                                │
//! │  axum HTTP Server                                              │
//! │  GET /health                    → {"status":"ok"}              │
//! │  GET /api/transactions/{i}      → one-shot fetch               │
//! │  GET /api/snapshot              → cached snapshot              │
//! │  GET /metrics                   → Prometheus text              │
//! │  GET /ws                        → WebSocket upgrade            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dexwatch_hub::{Hub, HubConfig};
//!
//! let hub = Hub::new(monitor.clone(), HubConfig::default(), Some(default_interval))?;
//! hub.run().await?;
//! ```

mod broadcast;
mod config;
mod control;
mod error;
mod gateway;
mod protocol;
mod server;
mod session;

pub use config::HubConfig;
pub use control::IntervalControl;
pub use error::{HubError, HubResult};
pub use protocol::{
    ClientMessage, ErrorResponse, HealthResponse, RecordView, ServerMessage, SnapshotResponse,
    TransactionsResponse,
};
pub use server::Hub;
pub use session::{Session, SessionRegistry};
