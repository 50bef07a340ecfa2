//! Backtest command implementation.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use scalper_config::load_config;
use scalper_core::types::Bar;
use scalper_data::CsvArchive;
use scalper_engine::{BacktestConfig, BacktestEngine, TradeAudit};

use crate::cli::BacktestArgs;

use super::{build_contexts, parse_date_bound, select_symbols};

pub async fn run(args: BacktestArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    config.validate()?;

    let selected = select_symbols(&config, &args.symbols)?;
    let mut contexts = build_contexts(&selected)?;

    let from = args
        .from
        .as_deref()
        .or(config.backtest.from.as_deref())
        .map(|v| parse_date_bound(v, false))
        .transpose()?;
    let to = args
        .to
        .as_deref()
        .or(config.backtest.to.as_deref())
        .map(|v| parse_date_bound(v, true))
        .transpose()?;

    let mut data: HashMap<String, Vec<Bar>> = HashMap::new();
    for (symbol, settings) in &selected {
        let path = settings
            .data_file
            .as_deref()
            .with_context(|| format!("{}: data_file is required for backtesting", symbol))?;
        let archive = CsvArchive::new(path)?;
        let bars = archive.load_range(from, to)?;
        info!(symbol = %symbol, bars = bars.len(), "archive loaded");
        data.insert((*symbol).clone(), bars);
    }

    let initial_capital = match args.capital {
        Some(capital) => Decimal::try_from(capital).context("invalid capital")?,
        None => config.backtest.initial_capital,
    };
    let backtest_config = BacktestConfig {
        initial_capital,
        max_trade_duration_bars: config.engine.max_trade_duration_bars,
    };

    let engine = BacktestEngine::new(backtest_config);
    let report = engine.run(&mut contexts, &data)?;

    match args.output.as_str() {
        "json" => println!("{}", report.to_json()?),
        _ => println!("{}", report.summary()),
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)?;
        info!("Report saved to {:?}", save_path);
    }
    if let Some(equity_path) = &args.equity {
        std::fs::write(equity_path, report.equity_to_csv())?;
        info!("Equity curve saved to {:?}", equity_path);
    }
    if let Some(trade_log) = &config.engine.trade_log {
        TradeAudit::new(trade_log).record_all(&report.stats.trades)?;
        info!("Trades appended to {}", trade_log);
    }

    Ok(())
}
