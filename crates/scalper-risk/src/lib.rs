//! Percent-risk position sizing.

pub mod sizer;
pub mod symbol_spec;

pub use sizer::RiskSizer;
pub use symbol_spec::SymbolSpec;
