//! Core traits for the scalping engine.

mod broker;
mod feed;
mod indicator;
mod strategy;

pub use broker::Broker;
pub use feed::BarFeed;
pub use indicator::Indicator;
pub use strategy::{PositionOutcome, Strategy, StrategyConfig, StrategyState};
