//! CLI command implementations.

pub mod backtest;
pub mod live;
pub mod paper;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use scalper_config::{AppConfig, SymbolSettings};
use scalper_engine::SymbolContext;
use scalper_risk::RiskSizer;
use scalper_strategies::StrategyRegistry;

/// Select configured symbols, honoring an optional CLI filter.
pub(crate) fn select_symbols<'a>(
    config: &'a AppConfig,
    filter: &[String],
) -> Result<Vec<(&'a String, &'a SymbolSettings)>> {
    let mut selected: Vec<_> = if filter.is_empty() {
        config.symbols.iter().collect()
    } else {
        filter
            .iter()
            .map(|symbol| {
                config
                    .symbols
                    .get_key_value(symbol)
                    .with_context(|| format!("symbol '{}' is not configured", symbol))
            })
            .collect::<Result<_>>()?
    };
    // Deterministic ordering regardless of map iteration order.
    selected.sort_by(|a, b| a.0.cmp(b.0));
    Ok(selected)
}

/// Build one evaluation context per selected symbol.
pub(crate) fn build_contexts(
    selected: &[(&String, &SymbolSettings)],
) -> Result<Vec<SymbolContext>> {
    let registry = StrategyRegistry::new();
    selected
        .iter()
        .map(|(symbol, settings)| {
            let strategy = registry
                .create(
                    &settings.strategy_type,
                    settings.strategy.clone(),
                    (*symbol).clone(),
                )
                .with_context(|| format!("failed to create strategy for {}", symbol))?;
            let sizer = RiskSizer::new(settings.risk_percent)
                .with_context(|| format!("invalid risk_percent for {}", symbol))?;
            Ok(SymbolContext::new(
                settings.timeframe,
                strategy,
                settings.spec.clone(),
                sizer,
            ))
        })
        .collect()
}

/// Parse a date bound into close-time milliseconds.
///
/// Accepts `YYYY-MM-DD`; an end bound covers the whole day.
pub(crate) fn parse_date_bound(value: &str, end_of_day: bool) -> Result<i64> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    let time = time.with_context(|| format!("invalid date '{}'", value))?;
    Ok(time.and_utc().timestamp_millis())
}
