//! Validate configuration command.

use anyhow::Result;
use std::path::Path;

use scalper_config::load_config;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Strategy tag: {}", config.engine.strategy_tag);
    println!("Max trade duration: {} bars", config.engine.max_trade_duration_bars);
    println!();
    for (symbol, settings) in &config.symbols {
        println!(
            "  {}: {} on {} at {}% risk",
            symbol, settings.strategy_type, settings.timeframe, settings.risk_percent
        );
    }

    Ok(())
}
