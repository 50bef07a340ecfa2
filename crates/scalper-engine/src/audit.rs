//! Trade audit trail.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use scalper_core::error::{EngineError, EngineResult};

use crate::statistics::TradeRecord;

/// Flat CSV row for one trade.
#[derive(Debug, Serialize)]
struct AuditRow<'a> {
    symbol: &'a str,
    direction: String,
    volume: String,
    entry_price: String,
    exit_price: String,
    pnl: String,
    outcome: String,
    opened_at: String,
    closed_at: String,
}

impl<'a> From<&'a TradeRecord> for AuditRow<'a> {
    fn from(trade: &'a TradeRecord) -> Self {
        Self {
            symbol: &trade.symbol,
            direction: trade.direction.to_string(),
            volume: trade.volume.to_string(),
            entry_price: trade.entry_price.to_string(),
            exit_price: trade.exit_price.to_string(),
            pnl: trade.pnl.to_string(),
            outcome: trade.outcome.to_string(),
            opened_at: trade.opened_at.to_rfc3339(),
            closed_at: trade.closed_at.to_rfc3339(),
        }
    }
}

/// Append-only CSV trade log.
///
/// Every closed trade goes through here in both modes, so a run always
/// leaves an inspectable record of what was traded and why it closed.
pub struct TradeAudit {
    path: PathBuf,
}

impl TradeAudit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one trade, writing the header if the file is new.
    pub fn record(&self, trade: &TradeRecord) -> EngineResult<()> {
        let new_file = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = WriterBuilder::new().has_headers(new_file).from_writer(file);
        writer
            .serialize(AuditRow::from(trade))
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Append a whole run's trades.
    pub fn record_all(&self, trades: &[TradeRecord]) -> EngineResult<()> {
        for trade in trades {
            self.record(trade)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use scalper_core::traits::PositionOutcome;
    use scalper_core::types::Direction;

    fn trade() -> TradeRecord {
        TradeRecord {
            symbol: "EURUSD".to_string(),
            direction: Direction::Long,
            volume: dec!(0.05),
            entry_price: dec!(1.1000),
            exit_price: dec!(1.1024),
            pnl: dec!(12),
            outcome: PositionOutcome::TakeProfit,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_appends_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let audit = TradeAudit::new(&path);

        audit.record(&trade()).unwrap();
        audit.record(&trade()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("symbol,"));
        assert!(lines[1].contains("TP Hit"));
        assert!(lines[2].contains("LONG"));
    }

    #[test]
    fn test_record_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let audit = TradeAudit::new(&path);

        audit.record_all(&[trade(), trade(), trade()]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
