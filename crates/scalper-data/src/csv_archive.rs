//! CSV bar archives.

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use scalper_core::error::FeedError;
use scalper_core::types::Bar;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "time")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", alias = "tick_volume", default)]
    volume: f64,
}

/// A CSV file holding the closed-bar history for one symbol.
///
/// Loaded bars come back sorted by close time with duplicate timestamps
/// dropped, so downstream series appends never fail on ordering.
pub struct CsvArchive {
    path: PathBuf,
}

impl CsvArchive {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, FeedError> {
        let path = path.into();
        if !Path::new(&path).exists() {
            return Err(FeedError::Unavailable(format!(
                "archive not found: {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Load every bar in the archive.
    pub fn load(&self) -> Result<Vec<Bar>, FeedError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        let mut bars = Vec::new();

        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| FeedError::Parse(e.to_string()))?;
            let timestamp = parse_timestamp(&record.date)?;

            bars.push(Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        if bars.is_empty() {
            return Err(FeedError::NoData);
        }

        bars.sort_by_key(|b| b.timestamp);

        let before = bars.len();
        bars.dedup_by_key(|b| b.timestamp);
        if bars.len() < before {
            warn!(
                path = %self.path.display(),
                dropped = before - bars.len(),
                "duplicate timestamps dropped from archive"
            );
        }

        Ok(bars)
    }

    /// Load bars whose close time falls within `[from, to]` (Unix ms,
    /// either bound optional).
    pub fn load_range(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<Bar>, FeedError> {
        let bars: Vec<Bar> = self
            .load()?
            .into_iter()
            .filter(|b| from.map_or(true, |f| b.timestamp >= f))
            .filter(|b| to.map_or(true, |t| b.timestamp <= t))
            .collect();

        if bars.is_empty() {
            return Err(FeedError::NoData);
        }
        Ok(bars)
    }
}

/// Parse the timestamp formats archives show up with.
fn parse_timestamp(date_str: &str) -> Result<i64, FeedError> {
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y.%m.%d %H:%M"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp_millis());
            }
        }
    }

    // Bare Unix timestamp, seconds or milliseconds.
    if let Ok(ts) = date_str.parse::<i64>() {
        if ts > 10_000_000_000 {
            return Ok(ts);
        } else {
            return Ok(ts * 1000);
        }
    }

    Err(FeedError::Parse(format!(
        "Could not parse date: {}",
        date_str
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_archive(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-01-15").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("1705312800000").is_ok()); // Unix ms
        assert!(parse_timestamp("1705312800").is_ok()); // Unix sec
        assert!(parse_timestamp("not a date").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvArchive::new("/nonexistent/archive.csv"),
            Err(FeedError::Unavailable(_))
        ));
    }

    #[test]
    fn test_load_sorts_and_dedupes() {
        let file = write_archive(
            "time,open,high,low,close,tick_volume\n\
             1705312800,1.1,1.2,1.0,1.15,100\n\
             1705312500,1.0,1.1,0.9,1.1,90\n\
             1705312800,9.9,9.9,9.9,9.9,1\n",
        );
        let archive = CsvArchive::new(file.path()).unwrap();
        let bars = archive.load().unwrap();

        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn test_load_range() {
        let file = write_archive(
            "time,open,high,low,close,tick_volume\n\
             1000000000,1.0,1.0,1.0,1.0,1\n\
             2000000000,1.0,1.0,1.0,1.0,1\n\
             3000000000,1.0,1.0,1.0,1.0,1\n",
        );
        let archive = CsvArchive::new(file.path()).unwrap();

        let bars = archive
            .load_range(Some(1_500_000_000_000), Some(2_500_000_000_000))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, 2_000_000_000_000);

        assert!(matches!(
            archive.load_range(Some(9_000_000_000_000), None),
            Err(FeedError::NoData)
        ));
    }

    #[test]
    fn test_empty_archive() {
        let file = write_archive("time,open,high,low,close,tick_volume\n");
        let archive = CsvArchive::new(file.path()).unwrap();
        assert!(matches!(archive.load(), Err(FeedError::NoData)));
    }
}
