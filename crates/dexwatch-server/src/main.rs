//! dexwatch - Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dexwatch_server::{AppConfig, Application};
use dexwatch_telemetry::{init_logging, install_panic_hook};
use tracing::info;

/// Live feed of large DEX trades over WebSocket.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "DEXWATCH_CONFIG", default_value = "config/default.toml")]
    config: PathBuf,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;

    if args.print_config {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    init_logging(config.mode, &config.log_level)?;
    install_panic_hook(config.mode);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %args.config.display(),
        "Starting dexwatch"
    );
    info!(source = ?config.source, hub = ?config.hub, "Configuration loaded");

    Application::new(config)?.run().await?;

    Ok(())
}
