//! Timeframe definitions for market data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timeframe for bars/candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1 minute bars
    #[serde(rename = "M1", alias = "1m")]
    Minute1,
    /// 5 minute bars
    #[serde(rename = "M5", alias = "5m")]
    #[default]
    Minute5,
    /// 15 minute bars
    #[serde(rename = "M15", alias = "15m")]
    Minute15,
    /// 30 minute bars
    #[serde(rename = "M30", alias = "30m")]
    Minute30,
    /// 1 hour bars
    #[serde(rename = "H1", alias = "1h")]
    Hour1,
    /// 4 hour bars
    #[serde(rename = "H4", alias = "4h")]
    Hour4,
    /// Daily bars
    #[serde(rename = "D1", alias = "1d")]
    Daily,
}

impl Timeframe {
    /// Get the duration of the timeframe in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Minute30 => 1800,
            Timeframe::Hour1 => 3600,
            Timeframe::Hour4 => 14400,
            Timeframe::Daily => 86400,
        }
    }

    /// Get the duration of the timeframe in milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.as_secs() as i64 * 1000
    }

    /// Check if this is an intraday timeframe.
    pub fn is_intraday(&self) -> bool {
        !matches!(self, Timeframe::Daily)
    }

    /// Get all available timeframes.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Minute1,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Daily,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::Minute1 => "M1",
            Timeframe::Minute5 => "M5",
            Timeframe::Minute15 => "M15",
            Timeframe::Minute30 => "M30",
            Timeframe::Hour1 => "H1",
            Timeframe::Hour4 => "H4",
            Timeframe::Daily => "D1",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "M1" | "1M" => Ok(Timeframe::Minute1),
            "M5" | "5M" => Ok(Timeframe::Minute5),
            "M15" | "15M" => Ok(Timeframe::Minute15),
            "M30" | "30M" => Ok(Timeframe::Minute30),
            "H1" | "1H" => Ok(Timeframe::Hour1),
            "H4" | "4H" => Ok(Timeframe::Hour4),
            "D1" | "1D" => Ok(Timeframe::Daily),
            other => Err(format!("Invalid timeframe: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(Timeframe::Minute5.as_secs(), 300);
        assert_eq!(Timeframe::Hour1.as_millis(), 3_600_000);
    }

    #[test]
    fn test_parse() {
        assert_eq!("M5".parse::<Timeframe>().unwrap(), Timeframe::Minute5);
        assert_eq!("m15".parse::<Timeframe>().unwrap(), Timeframe::Minute15);
        assert_eq!("1h".parse::<Timeframe>().unwrap(), Timeframe::Hour1);
        assert!("M7".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_intraday() {
        assert!(Timeframe::Minute5.is_intraday());
        assert!(!Timeframe::Daily.is_intraday());
    }
}
