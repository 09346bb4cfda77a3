//! Application wiring and lifecycle.

use std::future::Future;
use std::sync::Arc;

use dexwatch_fetch::{BitqueryClient, DynFetcher};
use dexwatch_hub::Hub;
use dexwatch_monitor::{Monitor, StartStatus};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    monitor: Monitor,
}

impl Application {
    /// Create the application with the configured upstream source.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        if config.source.api_key.is_empty() {
            warn!("No upstream API key configured, requests will be unauthenticated");
        }
        let client = BitqueryClient::new(config.source.clone())?;
        Ok(Self::with_fetcher(config, Arc::new(client)))
    }

    /// Create the application around any fetcher.
    pub fn with_fetcher(config: AppConfig, fetcher: DynFetcher) -> Self {
        Self {
            monitor: Monitor::new(fetcher),
            config,
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bind the configured address and run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let listener = TcpListener::bind(self.config.hub.bind_addr()?).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Run on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let interval = self.config.default_interval;
        info!(
            mode = ?self.config.mode,
            interval = interval.minutes(),
            "Starting application"
        );

        self.monitor.initialize().await;
        let status = self.monitor.start(interval).await;
        if status != StartStatus::Started {
            warn!(%interval, ?status, "Default interval was not started");
        }

        let hub = Arc::new(Hub::new(
            self.monitor.clone(),
            self.config.hub.clone(),
            Some(interval),
        )?);

        let signal_hub = Arc::clone(&hub);
        let watcher = tokio::spawn(async move {
            shutdown.await;
            info!("Shutdown signal received");
            signal_hub.shutdown();
        });

        let served = hub.serve(listener).await;
        watcher.abort();

        info!(
            active = ?self.monitor.active_intervals(),
            sessions = hub.sessions().len(),
            "Shutting down"
        );
        self.monitor.shutdown();

        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
