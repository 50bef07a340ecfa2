//! Backtest statistics.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use scalper_core::traits::PositionOutcome;
use scalper_core::types::{AccountState, Direction};

/// Record of one round-trip trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub direction: Direction,
    pub volume: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub outcome: PositionOutcome,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Aggregated backtest statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStats {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Final equity
    pub final_equity: Decimal,
    /// Total return percentage
    pub total_return_pct: Decimal,
    /// Maximum drawdown percentage
    pub max_drawdown_pct: Decimal,
    /// Sharpe ratio over per-bar returns (risk-free rate 0)
    pub sharpe_ratio: f64,
    /// Total number of round-trip trades
    pub total_trades: usize,
    /// Number of winning trades
    pub winning_trades: usize,
    /// Number of losing trades
    pub losing_trades: usize,
    /// Number of breakeven trades
    pub breakeven_trades: usize,
    /// Trades closed at the target
    pub target_exits: usize,
    /// Trades closed at the stop
    pub stop_exits: usize,
    /// Trades closed by the holding-time limit
    pub time_stop_exits: usize,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade
    pub avg_loss: Decimal,
    /// Profit factor (gross profit / gross loss)
    pub profit_factor: Decimal,
    /// Number of bars processed
    pub bars_processed: usize,
    /// Equity curve
    pub equity_curve: Vec<(i64, Decimal)>,
    /// All trades
    pub trades: Vec<TradeRecord>,
    /// Peak equity (for drawdown)
    peak_equity: Decimal,
    /// Per-bar returns for Sharpe calculation
    bar_returns: Vec<f64>,
}

impl BacktestStats {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            total_return_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            breakeven_trades: 0,
            target_exits: 0,
            stop_exits: 0,
            time_stop_exits: 0,
            win_rate_pct: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            bars_processed: 0,
            equity_curve: Vec::new(),
            trades: Vec::new(),
            peak_equity: initial_capital,
            bar_returns: Vec::new(),
        }
    }

    /// Record equity at a bar close.
    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) {
        if let Some((_, prev_equity)) = self.equity_curve.last() {
            if *prev_equity > Decimal::ZERO {
                let ret = ((equity - *prev_equity) / *prev_equity)
                    .to_f64()
                    .unwrap_or(0.0);
                self.bar_returns.push(ret);
            }
        }

        self.equity_curve.push((timestamp, equity));

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }

        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * dec!(100);
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }

        self.bars_processed += 1;
    }

    /// Add a round-trip trade record.
    pub fn add_trade(&mut self, trade: TradeRecord) {
        match trade.outcome {
            PositionOutcome::TakeProfit => self.target_exits += 1,
            PositionOutcome::StopLoss => self.stop_exits += 1,
            PositionOutcome::TimeStop => self.time_stop_exits += 1,
            _ => {}
        }
        self.trades.push(trade);
        self.total_trades += 1;
    }

    /// Calculate final statistics.
    pub fn finalize(&mut self, account: &AccountState) {
        self.final_equity = account.equity;

        if self.initial_capital > Decimal::ZERO {
            self.total_return_pct =
                (self.final_equity - self.initial_capital) / self.initial_capital * dec!(100);
        }

        let mut total_profit = Decimal::ZERO;
        let mut total_loss = Decimal::ZERO;

        for trade in &self.trades {
            if trade.pnl > Decimal::ZERO {
                self.winning_trades += 1;
                total_profit += trade.pnl;
            } else if trade.pnl < Decimal::ZERO {
                self.losing_trades += 1;
                total_loss += trade.pnl.abs();
            } else {
                self.breakeven_trades += 1;
            }
        }

        if self.total_trades > 0 {
            self.win_rate_pct =
                Decimal::from(self.winning_trades * 100) / Decimal::from(self.total_trades);
        }

        if self.winning_trades > 0 {
            self.avg_win = total_profit / Decimal::from(self.winning_trades);
        }
        if self.losing_trades > 0 {
            self.avg_loss = total_loss / Decimal::from(self.losing_trades);
        }

        if total_loss > Decimal::ZERO {
            self.profit_factor = total_profit / total_loss;
        }

        // Sharpe over per-bar returns, annualized from the curve's own span.
        if self.bar_returns.len() > 1 {
            let mean: f64 = self.bar_returns.iter().sum::<f64>() / self.bar_returns.len() as f64;
            let variance: f64 = self
                .bar_returns
                .iter()
                .map(|r| (r - mean).powi(2))
                .sum::<f64>()
                / self.bar_returns.len() as f64;
            let std_dev = variance.sqrt();

            if std_dev > 0.0 {
                if let Some(bars_per_year) = self.bars_per_year() {
                    self.sharpe_ratio = mean / std_dev * bars_per_year.sqrt();
                }
            }
        }
    }

    fn bars_per_year(&self) -> Option<f64> {
        let first = self.equity_curve.first()?.0;
        let last = self.equity_curve.last()?.0;
        if last <= first {
            return None;
        }
        let years = (last - first) as f64 / (365.25 * 24.0 * 3600.0 * 1000.0);
        Some(self.equity_curve.len() as f64 / years)
    }
}
