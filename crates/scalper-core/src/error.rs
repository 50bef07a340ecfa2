//! Error types for the scalping engine.

use thiserror::Error;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Sizing error: {0}")]
    Sizing(#[from] SizingError),

    #[error("Symbol {symbol} halted: {reason}")]
    SymbolHalted { symbol: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Strategy error: {0}")]
    Internal(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    /// Warm-up not met. The caller must accumulate bars, not evaluate.
    #[error("Insufficient history: need {required} bars, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Position sizing errors.
#[derive(Error, Debug)]
pub enum SizingError {
    /// Degenerate signal with no measurable risk. The signal is discarded.
    #[error("Stop distance is zero or negative, cannot size position")]
    ZeroStopDistance,

    /// Computed volume fell below the broker minimum; taking the trade would
    /// skew the configured risk, so it is skipped.
    #[error("Volume {computed} below broker minimum {minimum}")]
    BelowMinimumVolume {
        computed: rust_decimal::Decimal,
        minimum: rust_decimal::Decimal,
    },

    #[error("Invalid symbol spec: {0}")]
    InvalidSpec(String),
}

/// Broker-side errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Order not placed. The symbol resolves back to flat and awaits the
    /// next signal; no retry.
    #[error("Order rejected: {0}")]
    Rejected(String),

    /// Transient I/O failure, retried with backoff up to a bounded count.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Insufficient margin: required {required}, available {available}")]
    InsufficientMargin {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Broker error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Whether the failure is transient and worth a bounded retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Unavailable(_))
    }
}

/// Bar feed errors.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoData,

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FeedError {
    /// Whether the failure is transient and worth a bounded retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Unavailable(_))
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
