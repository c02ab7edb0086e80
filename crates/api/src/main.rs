//! Battery Fleet Monitor - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Battery Fleet Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        interval_ms = config.engine.scheduler.evaluation_interval_ms,
        evaluate_on_ingest = config.engine.scheduler.evaluate_on_ingest,
        "Starting fleet health engine..."
    );

    run_server(config).await
}
