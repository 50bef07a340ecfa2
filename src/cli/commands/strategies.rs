//! List strategies command.

use anyhow::Result;
use scalper_strategies::StrategyRegistry;

pub async fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ", info.name);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!();
    }

    println!("Configure a strategy per symbol with [symbols.<SYMBOL>] in the");
    println!("config file; strategy_type selects one of the names above.");

    Ok(())
}
