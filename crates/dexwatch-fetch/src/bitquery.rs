//! HTTP client for the Bitquery GraphQL API.
//!
//! Fetches large DEX buys on one EVM network and hands the body to
//! [`crate::normalize`].

use std::fmt;
use std::time::Duration;

use dexwatch_core::Record;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{FetchError, FetchResult};
use crate::fetcher::{BoxFuture, Fetcher};
use crate::normalize::parse_response;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-API-KEY";

/// Upstream source configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct BitqueryConfig {
    /// GraphQL endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key (empty = send no key).
    #[serde(default)]
    pub api_key: String,
    /// EVM network name as understood by the API (e.g., "bsc", "eth").
    #[serde(default = "default_network")]
    pub network: String,
    /// Only buys above this USD amount are returned.
    #[serde(default = "default_min_amount_usd")]
    pub min_amount_usd: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://streaming.bitquery.io/graphql".to_string()
}

fn default_network() -> String {
    "bsc".to_string()
}

fn default_min_amount_usd() -> String {
    "100000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for BitqueryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            network: default_network(),
            min_amount_usd: default_min_amount_usd(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for BitqueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitqueryConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("network", &self.network)
            .field("min_amount_usd", &self.min_amount_usd)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// GraphQL request body.
#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
    variables: serde_json::Value,
}

/// Build the DEX trade query for a network and USD threshold.
pub fn build_query(network: &str, min_amount_usd: &str) -> String {
    format!(
        r#"query {{
  EVM(network: {network}) {{
    DEXTrades(where: {{Trade: {{Buy: {{AmountInUSD: {{gt: "{min_amount_usd}"}}}}}}}}) {{
      Block {{ Time Number }}
      Transaction {{ Hash }}
      Trade {{
        Buy {{
          Amount
          AmountInUSD
          Buyer
          Seller
          Price
          PriceInUSD
          Currency {{ Name Symbol }}
        }}
        Dex {{ ProtocolFamily ProtocolName ProtocolVersion SmartContract }}
        Sell {{
          Amount
          AmountInUSD
          Buyer
          Seller
          Price
          PriceInUSD
          Currency {{ Name Symbol }}
        }}
      }}
    }}
  }}
}}"#
    )
}

/// Client for the upstream trade source.
pub struct BitqueryClient {
    /// HTTP client.
    client: Client,
    /// Source configuration.
    config: BitqueryConfig,
    /// Pre-rendered query (configuration does not change at runtime).
    query: String,
}

impl BitqueryClient {
    /// Create a new client.
    pub fn new(config: BitqueryConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {e}")))?;
        let query = build_query(&config.network, &config.min_amount_usd);

        Ok(Self {
            client,
            config,
            query,
        })
    }

    /// Fetch and normalize the current batch of trades.
    pub async fn fetch_trades(&self) -> FetchResult<Vec<Record>> {
        debug!(endpoint = %self.config.endpoint, network = %self.config.network, "Fetching trades");

        let request = GraphQlRequest {
            query: self.query.clone(),
            variables: serde_json::json!({}),
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.header(API_KEY_HEADER, &self.config.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "Trade source request failed");
            FetchError::Transport(format!("HTTP request failed: {e}"))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            error!(%status, body = %body, "Trade source returned error status");
            return Err(FetchError::Transport(format!("HTTP {status}: {body}")));
        }

        let records = parse_response(&body).map_err(|e| {
            error!(error = %e, "Trade source response rejected");
            e
        })?;
        debug!(count = records.len(), "Trades fetched");
        Ok(records)
    }
}

impl Fetcher for BitqueryClient {
    fn fetch(&self) -> BoxFuture<'_, FetchResult<Vec<Record>>> {
        Box::pin(self.fetch_trades())
    }
}
