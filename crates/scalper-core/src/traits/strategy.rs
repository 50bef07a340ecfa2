//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::types::{BarSeries, Signal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;
}

/// How a position ended, reported back to the strategy on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionOutcome {
    /// Take-profit hit
    TakeProfit,
    /// Stop-loss hit
    StopLoss,
    /// Maximum holding duration reached
    TimeStop,
    /// Closed by an explicit engine request
    Manual,
    /// Closed outside the engine (observed via reconciliation)
    External,
    /// Entry never executed (sizing skip or broker rejection)
    Rejected,
}

impl std::fmt::Display for PositionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionOutcome::TakeProfit => write!(f, "TP Hit"),
            PositionOutcome::StopLoss => write!(f, "SL Hit"),
            PositionOutcome::TimeStop => write!(f, "Time Stop"),
            PositionOutcome::Manual => write!(f, "Manual Close"),
            PositionOutcome::External => write!(f, "External Close"),
            PositionOutcome::Rejected => write!(f, "Entry Rejected"),
        }
    }
}

/// State of a strategy for monitoring and serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyState {
    /// Strategy name
    pub name: String,
    /// Whether the strategy has processed enough bars to generate signals
    pub is_warmed_up: bool,
    /// Number of bars processed
    pub bars_processed: usize,
    /// Number of signals generated
    pub signals_generated: usize,
    /// Current indicator values
    pub indicators: HashMap<String, f64>,
    /// Custom strategy-specific state
    pub custom: serde_json::Value,
}

impl Default for StrategyState {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_warmed_up: false,
            bars_processed: 0,
            signals_generated: 0,
            indicators: HashMap::new(),
            custom: serde_json::Value::Null,
        }
    }
}

/// Core strategy trait.
///
/// A strategy instance evaluates exactly one symbol. It receives fully
/// closed bars in strict timestamp order and emits at most one signal per
/// bar close. The engine reports position closure back via
/// [`Strategy::on_position_closed`], which returns the strategy to its flat
/// state.
pub trait Strategy: Send + Sync {
    /// Get the unique name of this strategy.
    fn name(&self) -> &str;

    /// The symbol this instance evaluates.
    fn symbol(&self) -> &str;

    /// Process a new closed bar and optionally generate a signal.
    ///
    /// Called once per bar-close event with the series including the new
    /// bar. While warm-up history is insufficient the strategy accumulates
    /// and returns `None`.
    fn on_bar(&mut self, series: &BarSeries) -> Option<Signal>;

    /// Called when the position opened from this strategy's signal closes.
    fn on_position_closed(&mut self, outcome: PositionOutcome);

    /// Reset the strategy state (called before a backtest run).
    fn reset(&mut self);

    /// Get the current strategy state for monitoring.
    fn state(&self) -> StrategyState;

    /// Get the warmup period (number of bars needed before signals).
    fn warmup_period(&self) -> usize;

    /// Check if the strategy is warmed up.
    fn is_warmed_up(&self, bars_available: usize) -> bool {
        bars_available >= self.warmup_period()
    }

    /// Get a description of the strategy.
    fn description(&self) -> &str {
        ""
    }
}
