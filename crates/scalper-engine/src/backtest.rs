//! Bar-by-bar backtest harness.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use scalper_core::error::{EngineError, EngineResult};
use scalper_core::traits::PositionOutcome;
use scalper_core::types::{AccountState, Bar};

use crate::context::{OrderIntent, SymbolContext};
use crate::lifecycle::OpenPosition;
use crate::report::BacktestReport;
use crate::statistics::{BacktestStats, TradeRecord};

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Maximum closed bars a position may be held before a forced exit
    pub max_trade_duration_bars: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            max_trade_duration_bars: 10,
        }
    }
}

/// Replays archived bars through the shared decision path with simulated
/// execution.
///
/// Entries decided at a bar's close fill at the next bar's open for that
/// symbol (one bar of latency, matching live submission after a bar-close
/// poll). Exits are evaluated against each bar's full range with the stop
/// checked before the target; an entry still pending when the archive ends
/// is discarded.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Run a backtest over per-symbol bar archives. Contexts are reset
    /// first, so a repeated run over the same data produces an identical
    /// report.
    pub fn run(
        &self,
        contexts: &mut [SymbolContext],
        data: &HashMap<String, Vec<Bar>>,
    ) -> EngineResult<BacktestReport> {
        for ctx in contexts.iter_mut() {
            ctx.reset();
        }

        let index: HashMap<String, usize> = contexts
            .iter()
            .enumerate()
            .map(|(i, ctx)| (ctx.symbol().to_string(), i))
            .collect();

        // Merge all symbols into one timeline; ties break by symbol name so
        // the run order is fully deterministic.
        let mut timeline: Vec<(i64, &String, &Bar)> = Vec::new();
        for (symbol, bars) in data {
            if !index.contains_key(symbol) {
                return Err(EngineError::Config(format!(
                    "no context for archive symbol {}",
                    symbol
                )));
            }
            for bar in bars {
                timeline.push((bar.timestamp, symbol, bar));
            }
        }
        timeline.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut account = AccountState::new(self.config.initial_capital);
        let mut stats = BacktestStats::new(self.config.initial_capital);
        let mut last_closes: HashMap<String, Decimal> = HashMap::new();

        for (timestamp, symbol, bar) in timeline {
            let idx = index[symbol];
            let open = price(bar.open)?;
            let high = price(bar.high)?;
            let low = price(bar.low)?;
            let close = price(bar.close)?;

            // 1. Fill the entry staged at the previous bar close.
            {
                let ctx = &mut contexts[idx];
                if let Some((signal, volume)) = ctx.tracker.take_pending() {
                    let intent = OrderIntent {
                        signal,
                        volume,
                    };
                    let position = OpenPosition {
                        ticket: Uuid::new_v4(),
                        direction: intent.signal.direction,
                        volume: intent.volume,
                        entry_price: open,
                        stop_price: intent.stop_price(open)?,
                        target_price: intent.target_price(open)?,
                        opened_at: bar.timestamp,
                        bars_held: 0,
                    };
                    debug!(symbol = %symbol, entry = %open, "backtest fill");
                    ctx.tracker.activate(position);
                }
            }

            // 2. Exits against this bar's range, stop first, then the
            //    holding-time limit at the close.
            {
                let ctx = &mut contexts[idx];
                let exit = ctx
                    .tracker
                    .open_position()
                    .and_then(|p| p.exit_on_bar(high, low));

                let exit = match exit {
                    Some(hit) => Some(hit),
                    None => {
                        match ctx.tracker.note_bar(bar.timestamp) {
                            Some(held) if held >= self.config.max_trade_duration_bars => {
                                Some((close, PositionOutcome::TimeStop))
                            }
                            _ => None,
                        }
                    }
                };

                if let Some((exit_price, outcome)) = exit {
                    if let Some(position) = ctx.tracker.mark_closed() {
                        let pnl = position.pnl_at(ctx.spec(), exit_price);
                        account.apply_close(pnl);
                        ctx.notify_closed(outcome);
                        stats.add_trade(TradeRecord {
                            symbol: symbol.clone(),
                            direction: position.direction,
                            volume: position.volume,
                            entry_price: position.entry_price,
                            exit_price,
                            pnl,
                            outcome,
                            opened_at: millis_to_datetime(position.opened_at),
                            closed_at: millis_to_datetime(bar.timestamp),
                        });
                    }
                }
            }

            // 3. Re-mark equity before the decision so sizing sees the
            //    current account, then evaluate the bar.
            last_closes.insert(symbol.clone(), close);
            let (unrealized, exposure) = mark_open_positions(contexts, &last_closes);
            account.mark(unrealized, exposure);

            contexts[idx].on_closed_bar(*bar, account.equity)?;

            let (unrealized, exposure) = mark_open_positions(contexts, &last_closes);
            account.mark(unrealized, exposure);
            stats.record_equity(timestamp, account.equity);
        }

        // Archive exhausted: pending entries are discarded, open positions
        // closed at the last seen price.
        for ctx in contexts.iter_mut() {
            if ctx.tracker.abort_pending() {
                info!(symbol = %ctx.symbol(), "pending entry discarded at archive end");
                ctx.notify_closed(PositionOutcome::Rejected);
            }

            let last_close = last_closes.get(ctx.symbol()).copied();
            if let (Some(close), Some(position)) = (last_close, ctx.tracker.mark_closed()) {
                let pnl = position.pnl_at(ctx.spec(), close);
                account.apply_close(pnl);
                ctx.notify_closed(PositionOutcome::Manual);
                stats.add_trade(TradeRecord {
                    symbol: ctx.symbol().to_string(),
                    direction: position.direction,
                    volume: position.volume,
                    entry_price: position.entry_price,
                    exit_price: close,
                    pnl,
                    outcome: PositionOutcome::Manual,
                    opened_at: millis_to_datetime(position.opened_at),
                    closed_at: millis_to_datetime(
                        ctx.last_close_time().unwrap_or(position.opened_at),
                    ),
                });
            }
        }

        account.mark(Decimal::ZERO, Decimal::ZERO);
        stats.finalize(&account);

        Ok(BacktestReport {
            config: self.config.clone(),
            stats,
            final_account: account,
        })
    }
}

fn price(value: f64) -> EngineResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| EngineError::Internal(format!("unrepresentable price {}", value)))
}

fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn mark_open_positions(
    contexts: &[SymbolContext],
    last_closes: &HashMap<String, Decimal>,
) -> (Decimal, Decimal) {
    let mut unrealized = Decimal::ZERO;
    let mut exposure = Decimal::ZERO;
    for ctx in contexts {
        let Some(position) = ctx.tracker.open_position() else {
            continue;
        };
        let Some(&close) = last_closes.get(ctx.symbol()) else {
            continue;
        };
        unrealized += position.pnl_at(ctx.spec(), close);
        exposure += close * position.volume;
    }
    (unrealized, exposure)
}
