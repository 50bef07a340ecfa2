//! Percent-risk volume calculation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scalper_core::error::SizingError;

use crate::SymbolSpec;

/// Sizes orders so a stop-out loses a fixed percentage of current equity.
///
/// Volume is floored to the symbol's volume step, so realized risk is at
/// most the requested percentage, never above it. A computed volume below
/// the broker minimum is an error, not a silent bump to the minimum: the
/// minimum lot would risk more than the account allows.
#[derive(Debug, Clone)]
pub struct RiskSizer {
    risk_percent: Decimal,
}

impl RiskSizer {
    pub fn new(risk_percent: Decimal) -> Result<Self, SizingError> {
        if risk_percent <= Decimal::ZERO || risk_percent > dec!(100) {
            return Err(SizingError::InvalidSpec(format!(
                "risk_percent must be in (0, 100], got {}",
                risk_percent
            )));
        }
        Ok(Self { risk_percent })
    }

    pub fn risk_percent(&self) -> Decimal {
        self.risk_percent
    }

    /// Compute the order volume in lots for a trade with the given stop
    /// distance (in price units) at the given equity.
    pub fn size(
        &self,
        equity: Decimal,
        stop_distance: Decimal,
        spec: &SymbolSpec,
    ) -> Result<Decimal, SizingError> {
        spec.validate()?;
        if stop_distance <= Decimal::ZERO {
            return Err(SizingError::ZeroStopDistance);
        }
        if equity <= Decimal::ZERO {
            return Err(SizingError::InvalidSpec(format!(
                "equity must be greater than 0, got {}",
                equity
            )));
        }

        let risk_amount = equity * (self.risk_percent / dec!(100));
        // Loss per lot at the stop: stop distance expressed in ticks, valued.
        let loss_per_lot = (stop_distance / spec.tick_size) * spec.tick_value;

        let raw = risk_amount / loss_per_lot;
        let volume = (raw / spec.volume_step).floor() * spec.volume_step;

        if volume < spec.volume_min {
            return Err(SizingError::BelowMinimumVolume {
                computed: volume,
                minimum: spec.volume_min,
            });
        }

        Ok(volume.min(spec.volume_max))
    }
}
