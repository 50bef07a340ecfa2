//! Live trading command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use scalper_config::load_config;

use crate::cli::LiveArgs;

use super::select_symbols;

pub async fn run(args: LiveArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    config.validate()?;

    let selected = select_symbols(&config, &args.symbols)?;
    info!(
        symbols = selected.len(),
        strategy_tag = config.engine.strategy_tag,
        dry_run = args.dry_run,
        "live trading requested"
    );

    println!("Live trading requires a broker terminal connector.");
    println!("No connector is configured in this build; the engine itself is");
    println!("broker-agnostic and runs against any Broker + BarFeed pair.");
    println!("\nUse the 'paper' command to run the live loop against archived data.");

    Ok(())
}
