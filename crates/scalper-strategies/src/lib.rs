//! Trading strategy implementations.

pub mod ema_ribbon;
pub mod registry;

pub use ema_ribbon::{EmaRibbonConfig, EmaRibbonScalper};
pub use registry::{StrategyInfo, StrategyRegistry};
