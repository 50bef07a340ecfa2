//! Bar feed trait definition.

use crate::error::FeedError;
use crate::types::{Bar, Timeframe};
use async_trait::async_trait;

/// Trait for closed-bar sources.
///
/// A feed only ever returns bars whose close time has fully elapsed; a bar
/// still forming is never visible through this interface. That boundary is
/// what rules out intra-bar look-ahead by construction.
#[async_trait]
pub trait BarFeed: Send + Sync {
    /// Fetch closed bars for a symbol, oldest first.
    ///
    /// With `since = Some(ts)` only bars closing strictly after `ts` are
    /// returned; `None` returns the warm-up window the feed keeps for the
    /// symbol.
    async fn closed_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<i64>,
    ) -> Result<Vec<Bar>, FeedError>;

    /// Get the feed name.
    fn name(&self) -> &str;
}
