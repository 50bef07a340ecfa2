//! Indicator pipeline for the ribbon scalping strategy.
//!
//! All indicators here are pure per call: evaluated only over fully closed
//! bars, so appending future bars never changes a past result.

pub mod consolidation;
mod momentum;
mod moving_average;
mod ribbon;

pub use consolidation::ConsolidationDetector;
pub use momentum::Rsi;
pub use moving_average::{Ema, Sma};
pub use ribbon::{Alignment, RibbonPipeline, RibbonSnapshot};
