//! Broker-published contract specifications per symbol.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scalper_core::error::SizingError;
use serde::{Deserialize, Serialize};

/// Instrument contract parameters used for sizing and PnL conversion.
///
/// These come from the broker's symbol metadata, not from strategy
/// configuration, and must be validated before any sizing happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// Smallest conventional price increment quoted for the symbol
    pub pip_size: Decimal,
    /// Smallest tradeable price increment
    pub tick_size: Decimal,
    /// Account-currency value of one tick for one lot
    pub tick_value: Decimal,
    /// Volume granularity in lots
    pub volume_step: Decimal,
    /// Minimum order volume in lots
    pub volume_min: Decimal,
    /// Maximum order volume in lots
    pub volume_max: Decimal,
}

impl SymbolSpec {
    /// Reject specs a broker should never publish but occasionally does.
    pub fn validate(&self) -> Result<(), SizingError> {
        let positives = [
            ("pip_size", self.pip_size),
            ("tick_size", self.tick_size),
            ("tick_value", self.tick_value),
            ("volume_step", self.volume_step),
            ("volume_min", self.volume_min),
            ("volume_max", self.volume_max),
        ];
        for (name, value) in positives {
            if value <= Decimal::ZERO {
                return Err(SizingError::InvalidSpec(format!(
                    "{} must be greater than 0, got {}",
                    name, value
                )));
            }
        }
        if self.volume_min > self.volume_max {
            return Err(SizingError::InvalidSpec(format!(
                "volume_min {} exceeds volume_max {}",
                self.volume_min, self.volume_max
            )));
        }
        Ok(())
    }

    /// Account-currency value of one pip for one lot.
    pub fn pip_value(&self) -> Decimal {
        self.tick_value * (self.pip_size / self.tick_size)
    }

    /// Convert a price move into account currency for a given volume.
    pub fn price_move_value(&self, price_delta: Decimal, volume: Decimal) -> Decimal {
        (price_delta / self.tick_size) * self.tick_value * volume
    }

    /// A typical five-decimal FX major spec, used as a fallback when the
    /// broker does not publish metadata and in tests.
    pub fn fx_five_digit() -> Self {
        Self {
            pip_size: dec!(0.0001),
            tick_size: dec!(0.00001),
            tick_value: dec!(0.1),
            volume_step: dec!(0.01),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
        }
    }
}
