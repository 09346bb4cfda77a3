//! Application configuration.
//!
//! Sources, lowest precedence first:
//! 1. serde defaults
//! 2. TOML file (optional)
//! 3. `DEXWATCH_*` environment variables, `__` between nested keys
//!    (`DEXWATCH_HUB__PORT=8080`, `DEXWATCH_SOURCE__API_KEY=...`)

use std::path::Path;

use config::{Config, Environment, File};
use dexwatch_core::PollInterval;
use dexwatch_fetch::BitqueryConfig;
use dexwatch_hub::HubConfig;
use dexwatch_telemetry::RunMode;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DEXWATCH";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment mode (logging format, panic policy).
    #[serde(default)]
    pub mode: RunMode,
    /// Interval started at boot, in minutes.
    #[serde(default)]
    pub default_interval: PollInterval,
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upstream trade source.
    #[serde(default)]
    pub source: BitqueryConfig,
    /// Broadcast hub.
    #[serde(default)]
    pub hub: HubConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load `path` (if it exists) and overlay the process environment.
    pub fn load(path: &Path) -> AppResult<Self> {
        Self::build(path, environment())
    }

    /// Load with an explicit environment source.
    pub fn build(path: &Path, env: Environment) -> AppResult<Self> {
        let config: AppConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        self.hub.validate()?;
        if self.source.endpoint.trim().is_empty() {
            return Err(AppError::Config("source.endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Effective configuration as TOML, with the API key masked.
    pub fn to_redacted_toml(&self) -> AppResult<String> {
        let mut shown = self.clone();
        if !shown.source.api_key.is_empty() {
            shown.source.api_key = "***".to_string();
        }
        toml::to_string_pretty(&shown).map_err(|e| AppError::Config(e.to_string()))
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
