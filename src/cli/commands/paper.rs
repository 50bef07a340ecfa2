//! Paper trading command implementation.
//!
//! Runs the live engine against a simulated broker fed by a forward-only
//! replay of archived bars. The decision path is exactly the live one;
//! only the fill venue is simulated.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use scalper_broker::SimBroker;
use scalper_core::Broker;
use scalper_config::load_config;
use scalper_core::types::Bar;
use scalper_data::{CsvArchive, ReplayFeed};
use scalper_engine::{LiveConfig, LiveEngine, TradeAudit};

use crate::cli::PaperArgs;

use super::{build_contexts, select_symbols};

pub async fn run(args: PaperArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    config.validate()?;

    let selected = select_symbols(&config, &args.symbols)?;
    let contexts = build_contexts(&selected)?;

    let initial_capital = match args.capital {
        Some(capital) => Decimal::try_from(capital).context("invalid capital")?,
        None => config.backtest.initial_capital,
    };

    let mut broker = SimBroker::new(initial_capital);
    let mut feed = ReplayFeed::new();
    let mut data: HashMap<String, Vec<Bar>> = HashMap::new();
    for (symbol, settings) in &selected {
        let path = settings
            .data_file
            .as_deref()
            .with_context(|| format!("{}: data_file is required for paper trading", symbol))?;
        let bars = CsvArchive::new(path)?.load()?;
        info!(symbol = %symbol, bars = bars.len(), "archive loaded");
        broker = broker.with_spec((*symbol).clone(), settings.spec.clone());
        feed.load((*symbol).clone(), bars.clone())?;
        data.insert((*symbol).clone(), bars);
    }

    let broker = Arc::new(broker);
    let timeline = feed.timeline();
    let feed = Arc::new(feed);

    let live_config = LiveConfig {
        // Replay does not wait for wall-clock bars.
        poll_interval: Duration::from_millis(1),
        strategy_tag: config.engine.strategy_tag,
        max_trade_duration_bars: config.engine.max_trade_duration_bars,
        retry_delays: vec![Duration::from_millis(1); 3],
    };
    let mut engine = LiveEngine::new(
        Arc::clone(&broker),
        Arc::clone(&feed),
        live_config,
        contexts,
    );

    // The broker sees each bar before the feed exposes it, so attached
    // stops and targets trade server-side first, as they would live.
    let mut cursors: HashMap<&str, usize> = HashMap::new();
    for ts in timeline {
        for (symbol, bars) in &data {
            let cursor = cursors.entry(symbol.as_str()).or_insert(0);
            if let Some(bar) = bars.get(*cursor) {
                if bar.timestamp == ts {
                    broker
                        .on_bar(bar, symbol)
                        .with_context(|| format!("{}: simulated bar rejected", symbol))?;
                    *cursor += 1;
                }
            }
        }
        feed.advance_to(ts);
        engine.poll_once().await;
    }

    let account = broker.account().await?;
    let trades = engine.trades();

    println!("═══════════════════════════════════════════════════════════");
    println!("                    PAPER SESSION                           ");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    for trade in trades {
        println!(
            "  {} {} {} @ {} -> {} | {} | pnl {}",
            trade.symbol,
            trade.direction,
            trade.volume,
            trade.entry_price,
            trade.exit_price,
            trade.outcome,
            trade.pnl,
        );
    }
    println!();
    println!("  Trades:          {}", trades.len());
    println!("  Initial Capital: ${:.2}", initial_capital);
    println!("  Final Balance:   ${:.2}", account.balance);
    println!("  Final Equity:    ${:.2}", account.equity);

    if let Some(trade_log) = &config.engine.trade_log {
        TradeAudit::new(trade_log).record_all(trades)?;
        info!("Trades appended to {}", trade_log);
    }

    Ok(())
}
