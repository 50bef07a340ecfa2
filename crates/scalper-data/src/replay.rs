//! Replay feed over archived bars.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use scalper_core::error::FeedError;
use scalper_core::traits::BarFeed;
use scalper_core::types::{Bar, Timeframe};

/// A [`BarFeed`] over in-memory history, gated by a movable simulated
/// clock.
///
/// Only bars whose close time is at or before the clock are visible, so the
/// forward replay loop sees history exactly as a live feed would have
/// delivered it.
pub struct ReplayFeed {
    series: HashMap<String, Vec<Bar>>,
    clock: AtomicI64,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            clock: AtomicI64::new(i64::MIN),
        }
    }

    /// Register history for a symbol. Bars must already be sorted by close
    /// time; out-of-order input is rejected.
    pub fn load(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Result<(), FeedError> {
        if bars.windows(2).any(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(FeedError::Parse(
                "replay history must be strictly ordered by close time".into(),
            ));
        }
        self.series.insert(symbol.into(), bars);
        Ok(())
    }

    /// Move the simulated clock forward. Moving it backward has no effect;
    /// visibility only grows.
    pub fn advance_to(&self, timestamp: i64) {
        self.clock.fetch_max(timestamp, Ordering::SeqCst);
    }

    /// Current simulated clock, Unix milliseconds.
    pub fn now(&self) -> i64 {
        self.clock.load(Ordering::SeqCst)
    }

    /// Every distinct bar close time across all loaded symbols, ascending.
    /// This is the timeline a replay loop steps through.
    pub fn timeline(&self) -> Vec<i64> {
        let mut timestamps: Vec<i64> = self
            .series
            .values()
            .flatten()
            .map(|b| b.timestamp)
            .collect();
        timestamps.sort_unstable();
        timestamps.dedup();
        timestamps
    }

    pub fn symbols(&self) -> Vec<&String> {
        self.series.keys().collect()
    }
}

impl Default for ReplayFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BarFeed for ReplayFeed {
    async fn closed_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        since: Option<i64>,
    ) -> Result<Vec<Bar>, FeedError> {
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| FeedError::SymbolNotFound(symbol.to_string()))?;

        let now = self.now();
        Ok(bars
            .iter()
            .filter(|b| b.timestamp <= now)
            .filter(|b| since.map_or(true, |s| b.timestamp > s))
            .copied()
            .collect())
    }

    fn name(&self) -> &str {
        "Replay Feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_bar(ts: i64) -> Bar {
        Bar::new(ts, 1.0, 1.0, 1.0, 1.0, 1.0)
    }

    fn feed() -> ReplayFeed {
        let mut feed = ReplayFeed::new();
        feed.load("EURUSD", vec![flat_bar(1000), flat_bar(2000), flat_bar(3000)])
            .unwrap();
        feed
    }

    #[test]
    fn test_load_rejects_unordered_history() {
        let mut feed = ReplayFeed::new();
        assert!(feed
            .load("EURUSD", vec![flat_bar(2000), flat_bar(1000)])
            .is_err());
        assert!(feed
            .load("EURUSD", vec![flat_bar(1000), flat_bar(1000)])
            .is_err());
    }

    #[tokio::test]
    async fn test_future_bars_invisible() {
        let feed = feed();
        feed.advance_to(2000);

        let bars = feed
            .closed_bars("EURUSD", Timeframe::Minute5, None)
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars.last().unwrap().timestamp, 2000);
    }

    #[tokio::test]
    async fn test_since_is_strictly_after() {
        let feed = feed();
        feed.advance_to(3000);

        let bars = feed
            .closed_bars("EURUSD", Timeframe::Minute5, Some(2000))
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, 3000);
    }

    #[tokio::test]
    async fn test_clock_never_moves_backward() {
        let feed = feed();
        feed.advance_to(3000);
        feed.advance_to(1000);
        assert_eq!(feed.now(), 3000);

        let bars = feed
            .closed_bars("EURUSD", Timeframe::Minute5, None)
            .await
            .unwrap();
        assert_eq!(bars.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let feed = feed();
        assert!(matches!(
            feed.closed_bars("GBPUSD", Timeframe::Minute5, None).await,
            Err(FeedError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_timeline_merges_symbols() {
        let mut feed = feed();
        feed.load("GBPUSD", vec![flat_bar(1500), flat_bar(2000)])
            .unwrap();

        assert_eq!(feed.timeline(), vec![1000, 1500, 2000, 3000]);
    }
}
