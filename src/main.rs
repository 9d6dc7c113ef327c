use anyhow::Result;
use calendar_scan::commands::ScanCommands;
use calendar_scan::config::{ScanMode, ScreenerConfig};
use calendar_scan::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = ScreenerConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        provider = ?config.provider,
        policy = ?config.expiry_policy,
        mode = ?config.mode,
        "starting scan"
    );

    match &config.mode {
        ScanMode::Batch => ScanCommands::run_batch(&config).await?,
        ScanMode::Single(symbol) => ScanCommands::run_single(&config, symbol).await?,
    }

    Ok(())
}
