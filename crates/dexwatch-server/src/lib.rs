//! dexwatch server.
//!
//! Wires the components together:
//! - Bitquery fetcher as the upstream source
//! - Monitor with the configured default interval
//! - Broadcast hub (WebSocket + HTTP gateway)
//! - Graceful shutdown on Ctrl-C

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
