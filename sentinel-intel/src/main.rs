//! Sentinel Intel - Signal intelligence service.
//!
//! Ranks sentiment-scored signals, detects pattern shifts and adapts
//! alerting thresholds.

use anyhow::Result;
use sentinel_common::config::Config;
use sentinel_common::logging::init_logging;
use sentinel_intel::IntelService;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Sentinel Intel v{}", env!("CARGO_PKG_VERSION"));

    let service = IntelService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
