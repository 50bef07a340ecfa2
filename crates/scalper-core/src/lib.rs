//! Core types and traits for the scalping engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries, Timeframe)
//! - Trading signals and order/position types
//! - Account state
//! - Core traits for strategies, indicators, brokers, and bar feeds

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use traits::*;
pub use types::*;
