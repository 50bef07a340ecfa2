//! Replay harnesses.
//!
//! The same per-symbol decision path serves both harnesses: the backtest
//! engine drives it from archived bars with simulated fills, the live engine
//! drives it from a polled feed with broker submissions. Identical bar
//! history therefore produces identical decisions in both modes.

pub mod audit;
pub mod backtest;
pub mod context;
pub mod lifecycle;
pub mod live;
pub mod report;
pub mod statistics;

pub use audit::TradeAudit;
pub use backtest::{BacktestConfig, BacktestEngine};
pub use context::{OrderIntent, SymbolContext};
pub use lifecycle::{OpenPosition, PositionState, PositionTracker};
pub use live::{LiveConfig, LiveEngine};
pub use report::BacktestReport;
pub use statistics::{BacktestStats, TradeRecord};
