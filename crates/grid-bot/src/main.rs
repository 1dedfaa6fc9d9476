//! Grid trading bot - entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use grid_bot::{AppConfig, Application, HttpIndicatorProvider};
use grid_client::{DynVenue, VenueClient};
use grid_core::{Clock, SystemClock};
use grid_risk::{FixedIndicatorProvider, IndicatorProvider};

/// Autonomous grid trading bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via GRID_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    grid_telemetry::init_logging()?;

    info!("starting grid bot v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > GRID_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("GRID_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "loading configuration");
    let config = AppConfig::from_file(&config_path)?;
    config.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let venue = VenueClient::connect(config.client_config(), Arc::clone(&clock)).await?;
    let venue: DynVenue = Arc::new(venue);

    let indicators: Arc<dyn IndicatorProvider> = match &config.indicators.url {
        Some(url) => Arc::new(HttpIndicatorProvider::new(url.clone())?),
        None => {
            warn!("no indicator feed configured; every cycle will hold in cooldown");
            Arc::new(FixedIndicatorProvider::new(None))
        }
    };

    let mut app = Application::new(config, venue, indicators, clock);
    app.run().await?;

    Ok(())
}
