//! Trading signals.

use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Get the opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Sign for PnL calculations (+1 long, -1 short).
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// A directional trade instruction, produced at most once per qualifying bar
/// close and immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Symbol to trade
    pub symbol: String,
    /// Long or short
    pub direction: Direction,
    /// Reference entry price (close of the signal bar)
    pub entry_ref: f64,
    /// Stop distance in price units, always > 0 to be executable
    pub stop_distance: f64,
    /// Take-profit distance in price units
    pub target_distance: f64,
    /// Close time of the bar that produced the signal, Unix milliseconds
    pub timestamp: i64,
}

impl Signal {
    /// Stop price implied by an actual entry price.
    pub fn stop_price(&self, entry: f64) -> f64 {
        entry - self.direction.sign() * self.stop_distance
    }

    /// Target price implied by an actual entry price.
    pub fn target_price(&self, entry: f64) -> f64 {
        entry + self.direction.sign() * self.target_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
    }

    #[test]
    fn test_signal_prices() {
        let signal = Signal {
            symbol: "EURUSD".to_string(),
            direction: Direction::Long,
            entry_ref: 1.1000,
            stop_distance: 0.0030,
            target_distance: 0.0036,
            timestamp: 0,
        };

        assert!((signal.stop_price(1.1000) - 1.0970).abs() < 1e-9);
        assert!((signal.target_price(1.1000) - 1.1036).abs() < 1e-9);

        let short = Signal {
            direction: Direction::Short,
            ..signal
        };
        assert!((short.stop_price(1.1000) - 1.1030).abs() < 1e-9);
        assert!((short.target_price(1.1000) - 1.0964).abs() < 1e-9);
    }
}
