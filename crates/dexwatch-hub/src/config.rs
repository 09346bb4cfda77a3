//! Hub configuration.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};

/// Hub server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS (the frontend).
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Maximum concurrent WebSocket sessions.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Fan-out buffer per session before it starts lagging.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    /// Replies queued for one session (acks, errors).
    #[serde(default = "default_session_queue")]
    pub session_queue: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_frontend_url() -> String {
    "http://localhost:3002".to_string()
}

fn default_max_connections() -> usize {
    100
}

fn default_broadcast_capacity() -> usize {
    32
}

fn default_session_queue() -> usize {
    16
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: default_frontend_url(),
            max_connections: default_max_connections(),
            broadcast_capacity: default_broadcast_capacity(),
            session_queue: default_session_queue(),
        }
    }
}

impl HubConfig {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> HubResult<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| HubError::Config(format!("invalid host {:?}: {e}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// CORS origin header value.
    pub fn cors_origin(&self) -> HubResult<HeaderValue> {
        HeaderValue::from_str(self.frontend_url.trim_end_matches('/')).map_err(|e| {
            HubError::Config(format!("invalid frontend_url {:?}: {e}", self.frontend_url))
        })
    }

    /// Check every field that can be invalid.
    pub fn validate(&self) -> HubResult<()> {
        self.bind_addr()?;
        self.cors_origin()?;
        if self.max_connections == 0 {
            return Err(HubError::Config("max_connections must be positive".to_string()));
        }
        if self.broadcast_capacity == 0 || self.session_queue == 0 {
            return Err(HubError::Config(
                "broadcast_capacity and session_queue must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = HubConfig {
            host: "not-an-ip".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HubError::Config(_))));

        let config = HubConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HubConfig {
            frontend_url: "http://bad\norigin".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
