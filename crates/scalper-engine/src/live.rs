//! Live polling engine.
//!
//! Polls a [`BarFeed`] for newly closed bars and pushes them through the
//! same [`SymbolContext`] decision path the backtest uses. Entries are
//! submitted at market with attached stop/target, exits are detected by
//! reconciling tracker state against the broker's open positions. The paper
//! mode is this engine verbatim, wired to a replay feed and a simulated
//! broker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use scalper_core::error::{BrokerError, EngineError, EngineResult, FeedError};
use scalper_core::traits::{BarFeed, Broker, PositionOutcome};
use scalper_core::types::{Bar, OrderRequest};

use crate::context::{OrderIntent, SymbolContext};
use crate::lifecycle::OpenPosition;
use crate::statistics::TradeRecord;

/// Live engine settings.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// How often the feed is polled for new closed bars.
    pub poll_interval: Duration,
    /// Magic number stamped on every order, used to recognize our own
    /// positions on a shared account.
    pub strategy_tag: u64,
    /// Positions still open after this many full bars are closed at market.
    pub max_trade_duration_bars: usize,
    /// Backoff schedule for transient broker/feed failures. The attempt
    /// count is the schedule length plus one.
    pub retry_delays: Vec<Duration>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            strategy_tag: 777_001,
            max_trade_duration_bars: 10,
            retry_delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

trait Transient {
    fn transient(&self) -> bool;
}

impl Transient for BrokerError {
    fn transient(&self) -> bool {
        self.is_transient()
    }
}

impl Transient for FeedError {
    fn transient(&self) -> bool {
        self.is_transient()
    }
}

/// Retry a transient-failure-prone operation with bounded backoff.
async fn with_retry<T, E, Fut, Op>(delays: &[Duration], what: &str, mut op: Op) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.transient() && attempt < delays.len() => {
                warn!(error = %e, what, attempt = attempt + 1, "transient failure, retrying");
                tokio::time::sleep(delays[attempt]).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Forward-only trading loop over a broker and a bar feed.
pub struct LiveEngine<B, F> {
    broker: Arc<B>,
    feed: Arc<F>,
    config: LiveConfig,
    contexts: Vec<SymbolContext>,
    trades: Vec<TradeRecord>,
}

impl<B: Broker, F: BarFeed> LiveEngine<B, F> {
    pub fn new(
        broker: Arc<B>,
        feed: Arc<F>,
        config: LiveConfig,
        contexts: Vec<SymbolContext>,
    ) -> Self {
        Self {
            broker,
            feed,
            config,
            contexts,
            trades: Vec::new(),
        }
    }

    pub fn contexts(&self) -> &[SymbolContext] {
        &self.contexts
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Poll until the shutdown signal flips, then return the trade log.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Vec<TradeRecord> {
        info!(
            broker = self.broker.name(),
            feed = self.feed.name(),
            symbols = self.contexts.len(),
            "live engine started"
        );
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.poll_once().await;
                }
            }
        }
        info!(trades = self.trades.len(), "live engine stopped");
        self.trades
    }

    /// One poll pass over every symbol. A failing symbol is logged and
    /// skipped for this tick; the loop itself never dies.
    pub async fn poll_once(&mut self) {
        for idx in 0..self.contexts.len() {
            if let Err(e) = self.poll_symbol(idx).await {
                error!(symbol = self.contexts[idx].symbol(), error = %e, "symbol poll failed");
            }
        }
    }

    async fn poll_symbol(&mut self, idx: usize) -> EngineResult<()> {
        let symbol = self.contexts[idx].symbol().to_string();
        let timeframe = self.contexts[idx].timeframe();
        let since = self.contexts[idx].last_close_time();

        let feed = Arc::clone(&self.feed);
        let bars = with_retry(&self.config.retry_delays, "bar fetch", || {
            let feed = Arc::clone(&feed);
            let symbol = symbol.clone();
            async move { feed.closed_bars(&symbol, timeframe, since).await }
        })
        .await
        .map_err(EngineError::from)?;

        for bar in bars {
            self.on_new_bar(idx, &symbol, bar).await?;
        }
        Ok(())
    }

    async fn on_new_bar(&mut self, idx: usize, symbol: &str, bar: Bar) -> EngineResult<()> {
        let high = price(bar.high)?;
        let low = price(bar.low)?;
        let close = price(bar.close)?;

        self.reconcile(idx, symbol, bar.timestamp, high, low, close)
            .await?;
        self.apply_time_stop(idx, symbol, bar.timestamp, close)
            .await?;

        let broker = Arc::clone(&self.broker);
        let account = with_retry(&self.config.retry_delays, "account fetch", || {
            let broker = Arc::clone(&broker);
            async move { broker.account().await }
        })
        .await
        .map_err(EngineError::from)?;

        let intent = self.contexts[idx].on_closed_bar(bar, account.equity)?;
        if let Some(intent) = intent {
            self.submit_entry(idx, symbol, intent, bar.timestamp).await?;
        }
        Ok(())
    }

    /// Square tracker state against the broker's view.
    ///
    /// A tracked position the broker no longer holds was closed server-side
    /// between polls; the exit is inferred from the bar against the stored
    /// stop and target, stop first. A tagged broker position the tracker
    /// does not know about is adopted, which makes restarts idempotent.
    async fn reconcile(
        &mut self,
        idx: usize,
        symbol: &str,
        bar_timestamp: i64,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> EngineResult<()> {
        let open = self
            .broker
            .open_positions(self.config.strategy_tag)
            .await
            .map_err(EngineError::from)?;
        let broker_pos = open.iter().find(|p| p.symbol == symbol);

        let ctx = &mut self.contexts[idx];
        if let Some(position) = ctx.tracker.open_position().cloned() {
            if broker_pos.map_or(true, |p| p.ticket != position.ticket) {
                let (exit, outcome) = position
                    .exit_on_bar(high, low)
                    .unwrap_or((close, PositionOutcome::External));
                ctx.tracker.mark_closed();
                ctx.notify_closed(outcome);
                let pnl = position.pnl_at(ctx.spec(), exit);
                info!(symbol, %outcome, %exit, %pnl, "position closed by broker");
                self.trades.push(TradeRecord {
                    symbol: symbol.to_string(),
                    direction: position.direction,
                    volume: position.volume,
                    entry_price: position.entry_price,
                    exit_price: exit,
                    pnl,
                    outcome,
                    opened_at: millis_to_datetime(position.opened_at),
                    closed_at: millis_to_datetime(bar_timestamp),
                });
            }
        } else if ctx.tracker.is_flat() {
            if let Some(p) = broker_pos {
                warn!(symbol, ticket = %p.ticket, "adopting untracked position");
                ctx.tracker.adopt(p);
            }
        }
        Ok(())
    }

    /// Close a position that has been held for the configured maximum.
    async fn apply_time_stop(
        &mut self,
        idx: usize,
        symbol: &str,
        bar_timestamp: i64,
        close: Decimal,
    ) -> EngineResult<()> {
        let held = match self.contexts[idx].tracker.note_bar(bar_timestamp) {
            Some(held) if held >= self.config.max_trade_duration_bars => held,
            _ => return Ok(()),
        };
        let Some(position) = self.contexts[idx].tracker.open_position().cloned() else {
            return Ok(());
        };

        let broker = Arc::clone(&self.broker);
        let ticket = position.ticket;
        let result = with_retry(&self.config.retry_delays, "time-stop close", || {
            let broker = Arc::clone(&broker);
            async move { broker.close_position(ticket).await }
        })
        .await;
        if let Err(e) = result {
            // Still open on the broker; try again next bar.
            warn!(symbol, error = %e, "time-stop close failed");
            return Ok(());
        }

        let ctx = &mut self.contexts[idx];
        ctx.tracker.begin_close();
        ctx.tracker.mark_closed();
        ctx.notify_closed(PositionOutcome::TimeStop);
        let pnl = position.pnl_at(ctx.spec(), close);
        info!(symbol, bars_held = held, %pnl, "time stop exit");
        self.trades.push(TradeRecord {
            symbol: symbol.to_string(),
            direction: position.direction,
            volume: position.volume,
            entry_price: position.entry_price,
            exit_price: close,
            pnl,
            outcome: PositionOutcome::TimeStop,
            opened_at: millis_to_datetime(position.opened_at),
            closed_at: millis_to_datetime(bar_timestamp),
        });
        Ok(())
    }

    /// Submit a sized entry at market and arm the tracker from the fill.
    async fn submit_entry(
        &mut self,
        idx: usize,
        symbol: &str,
        intent: OrderIntent,
        bar_timestamp: i64,
    ) -> EngineResult<()> {
        let entry_ref = price(intent.signal.entry_ref)?;
        let stop = intent.stop_price(entry_ref)?;
        let target = intent.target_price(entry_ref)?;
        let request = OrderRequest::market(
            symbol,
            intent.signal.direction,
            intent.volume,
            stop,
            target,
            self.config.strategy_tag,
        );

        let broker = Arc::clone(&self.broker);
        let result = with_retry(&self.config.retry_delays, "order submit", || {
            let broker = Arc::clone(&broker);
            let request = request.clone();
            async move { broker.submit_order(request).await }
        })
        .await;

        let ticket = match result {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(symbol, error = %e, "entry not placed, resolving flat");
                self.contexts[idx].tracker.abort_pending();
                self.contexts[idx].notify_closed(PositionOutcome::Rejected);
                return Ok(());
            }
        };

        // Fill price from the broker's view of the new position.
        let open = self
            .broker
            .open_positions(self.config.strategy_tag)
            .await
            .map_err(EngineError::from)?;
        let entry_price = open
            .iter()
            .find(|p| p.ticket == ticket.id)
            .map(|p| p.entry_price)
            .unwrap_or(entry_ref);

        // The bar forming now is the fill bar; stamping the open with its
        // close time keeps it out of the held-bar count.
        let opened_at = bar_timestamp + self.contexts[idx].timeframe().as_millis();
        let ctx = &mut self.contexts[idx];
        let Some((_, volume)) = ctx.tracker.take_pending() else {
            return Ok(());
        };
        info!(symbol, ticket = %ticket.id, %entry_price, %stop, %target, %volume, "entry filled");
        ctx.tracker.activate(OpenPosition {
            ticket: ticket.id,
            direction: intent.signal.direction,
            volume,
            entry_price,
            stop_price: stop,
            target_price: target,
            opened_at,
            bars_held: 0,
        });
        Ok(())
    }
}

fn price(value: f64) -> EngineResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| EngineError::Internal(format!("unrepresentable price {}", value)))
}

fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use scalper_broker::SimBroker;
    use scalper_core::traits::{Strategy, StrategyState};
    use scalper_core::types::{BarSeries, Direction, Signal, Timeframe};
    use scalper_data::ReplayFeed;
    use scalper_risk::{RiskSizer, SymbolSpec};
    use scalper_strategies::{EmaRibbonConfig, EmaRibbonScalper};

    fn ribbon_context() -> SymbolContext {
        let config = EmaRibbonConfig {
            symbol: "EURUSD".to_string(),
            fast_periods: vec![1, 2],
            slow_period: 3,
            rsi_period: 2,
            rsi_level: 50.0,
            consolidation_threshold: 0.6,
            consolidation_window: 2,
            stop_range_multiple: 1.0,
            risk_reward_ratio: 1.5,
        };
        SymbolContext::new(
            Timeframe::Minute5,
            Box::new(EmaRibbonScalper::new(config).unwrap()),
            SymbolSpec::fx_five_digit(),
            RiskSizer::new(dec!(1)).unwrap(),
        )
    }

    /// Uptrend, tight pullback, trigger bar, then a bar that runs to the
    /// target.
    fn breakout_bars() -> Vec<Bar> {
        let closes = [
            100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 105.6, 105.2, 105.3,
        ];
        let mut bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let (high, low) = if i == 9 {
                    (105.35, 105.18)
                } else {
                    (close + 0.05, close - 0.05)
                };
                Bar::new(i as i64 * 60_000, close, high, low, close, 100.0)
            })
            .collect();
        bars.push(Bar::new(10 * 60_000, 105.31, 105.70, 105.30, 105.65, 100.0));
        bars
    }

    fn fast_config() -> LiveConfig {
        LiveConfig {
            poll_interval: Duration::from_millis(5),
            retry_delays: vec![Duration::from_millis(1); 3],
            ..Default::default()
        }
    }

    /// Emits one long signal on the second bar, then stays quiet.
    struct OneShot {
        fired: bool,
        bars_seen: usize,
        stop_distance: f64,
        target_distance: f64,
    }

    impl OneShot {
        fn new(stop_distance: f64, target_distance: f64) -> Self {
            Self {
                fired: false,
                bars_seen: 0,
                stop_distance,
                target_distance,
            }
        }
    }

    impl Strategy for OneShot {
        fn name(&self) -> &str {
            "one-shot"
        }

        fn symbol(&self) -> &str {
            "EURUSD"
        }

        fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
            self.bars_seen += 1;
            if self.fired || self.bars_seen < 2 {
                return None;
            }
            self.fired = true;
            let bar = series.last()?;
            Some(Signal {
                symbol: "EURUSD".to_string(),
                direction: Direction::Long,
                entry_ref: bar.close,
                stop_distance: self.stop_distance,
                target_distance: self.target_distance,
                timestamp: bar.timestamp,
            })
        }

        fn on_position_closed(&mut self, _outcome: PositionOutcome) {}

        fn reset(&mut self) {
            self.fired = false;
            self.bars_seen = 0;
        }

        fn state(&self) -> StrategyState {
            StrategyState::default()
        }

        fn warmup_period(&self) -> usize {
            2
        }
    }

    fn oneshot_context(stop_distance: f64, target_distance: f64) -> SymbolContext {
        SymbolContext::new(
            Timeframe::Minute1,
            Box::new(OneShot::new(stop_distance, target_distance)),
            SymbolSpec::fx_five_digit(),
            RiskSizer::new(dec!(1)).unwrap(),
        )
    }

    /// Drive the engine one bar at a time: the broker sees the bar first,
    /// then the feed exposes it, then the engine polls.
    async fn step(
        engine: &mut LiveEngine<SimBroker, ReplayFeed>,
        broker: &SimBroker,
        feed: &ReplayFeed,
        bar: &Bar,
        symbol: &str,
    ) {
        broker.on_bar(bar, symbol).unwrap();
        feed.advance_to(bar.timestamp);
        engine.poll_once().await;
    }

    #[tokio::test]
    async fn test_paper_replay_reproduces_backtest_decision() {
        let bars = breakout_bars();
        let broker = Arc::new(
            SimBroker::new(dec!(10000)).with_spec("EURUSD", SymbolSpec::fx_five_digit()),
        );
        let mut feed = ReplayFeed::new();
        feed.load("EURUSD", bars.clone()).unwrap();
        let feed = Arc::new(feed);

        let mut engine = LiveEngine::new(
            Arc::clone(&broker),
            Arc::clone(&feed),
            fast_config(),
            vec![ribbon_context()],
        );

        for bar in &bars {
            step(&mut engine, &broker, &feed, bar, "EURUSD").await;
        }

        // Same single long trade the backtest produces from this history,
        // filled at the signal bar's close instead of the next open.
        assert_eq!(engine.trades().len(), 1);
        let trade = &engine.trades()[0];
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.outcome, PositionOutcome::TakeProfit);
        assert_eq!(trade.volume, dec!(0.05));
        assert!((trade.entry_price - dec!(105.3)).abs() < dec!(0.0001));
        assert!((trade.exit_price - dec!(105.6)).abs() < dec!(0.0001));
        assert!((trade.pnl - dec!(150)).abs() < dec!(0.01));

        let account = broker.account().await.unwrap();
        assert!((account.balance - dec!(10150)).abs() < dec!(0.01));
        assert!(engine.contexts()[0].tracker.is_flat());
    }

    #[tokio::test]
    async fn test_restart_adopts_existing_position() {
        let broker = Arc::new(
            SimBroker::new(dec!(10000)).with_spec("EURUSD", SymbolSpec::fx_five_digit()),
        );
        broker.post_quote("EURUSD", dec!(1.1));
        let ticket = broker
            .submit_order(OrderRequest::market(
                "EURUSD",
                Direction::Long,
                dec!(0.10),
                dec!(1.08),
                dec!(1.13),
                LiveConfig::default().strategy_tag,
            ))
            .await
            .unwrap();

        let bars: Vec<Bar> = (0..2)
            .map(|i| Bar::new(i * 60_000, 1.1, 1.101, 1.099, 1.1, 100.0))
            .collect();
        let mut feed = ReplayFeed::new();
        feed.load("EURUSD", bars.clone()).unwrap();
        let feed = Arc::new(feed);

        let mut engine = LiveEngine::new(
            Arc::clone(&broker),
            Arc::clone(&feed),
            fast_config(),
            vec![ribbon_context()],
        );

        for bar in &bars {
            step(&mut engine, &broker, &feed, bar, "EURUSD").await;
        }

        let adopted = engine.contexts()[0].tracker.open_position().unwrap();
        assert_eq!(adopted.ticket, ticket.id);

        // Still exactly one broker position, no duplicate entry.
        let open = broker
            .open_positions(LiveConfig::default().strategy_tag)
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert!(engine.trades().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_entry_resolves_flat() {
        // No quote posted: the simulator rejects the order outright.
        let broker = Arc::new(
            SimBroker::new(dec!(10000)).with_spec("EURUSD", SymbolSpec::fx_five_digit()),
        );
        let bars: Vec<Bar> = (0..3)
            .map(|i| Bar::new(i * 60_000, 1.1, 1.101, 1.099, 1.1, 100.0))
            .collect();
        let mut feed = ReplayFeed::new();
        feed.load("EURUSD", bars.clone()).unwrap();
        let feed = Arc::new(feed);

        let mut engine = LiveEngine::new(
            Arc::clone(&broker),
            Arc::clone(&feed),
            fast_config(),
            vec![oneshot_context(0.02, 0.03)],
        );

        for bar in &bars {
            feed.advance_to(bar.timestamp);
            engine.poll_once().await;
        }

        assert!(engine.trades().is_empty());
        assert!(engine.contexts()[0].tracker.is_flat());
        let open = broker
            .open_positions(LiveConfig::default().strategy_tag)
            .await
            .unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn test_time_stop_closes_stale_position() {
        let broker = Arc::new(
            SimBroker::new(dec!(10000)).with_spec("EURUSD", SymbolSpec::fx_five_digit()),
        );
        let mut feed = ReplayFeed::new();
        // Flat tape: neither the 1.08 stop nor the 1.13 target can trade.
        let bars: Vec<Bar> = (0..6)
            .map(|i| Bar::new(i * 60_000, 1.1, 1.101, 1.099, 1.1, 100.0))
            .collect();
        feed.load("EURUSD", bars.clone()).unwrap();
        let feed = Arc::new(feed);

        let config = LiveConfig {
            max_trade_duration_bars: 2,
            ..fast_config()
        };
        let mut engine = LiveEngine::new(
            Arc::clone(&broker),
            Arc::clone(&feed),
            config,
            vec![oneshot_context(0.02, 0.03)],
        );

        for bar in &bars {
            step(&mut engine, &broker, &feed, bar, "EURUSD").await;
        }

        // Entry at bar 1's close; bar 2 is the fill bar and does not count,
        // so the stop trips after bars 3 and 4.
        assert_eq!(engine.trades().len(), 1);
        let trade = &engine.trades()[0];
        assert_eq!(trade.outcome, PositionOutcome::TimeStop);
        assert_eq!(trade.pnl, Decimal::ZERO);
        assert_eq!(trade.closed_at.timestamp_millis(), 4 * 60_000);
        assert!(engine.contexts()[0].tracker.is_flat());
        let open = broker
            .open_positions(LiveConfig::default().strategy_tag)
            .await
            .unwrap();
        assert!(open.is_empty());
    }

    /// Feed that fails transiently a fixed number of times before serving.
    struct FlakyFeed {
        inner: ReplayFeed,
        remaining_failures: AtomicUsize,
    }

    #[async_trait]
    impl BarFeed for FlakyFeed {
        async fn closed_bars(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            since: Option<i64>,
        ) -> Result<Vec<Bar>, FeedError> {
            if self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FeedError::Unavailable("flaky".to_string()));
            }
            self.inner.closed_bars(symbol, timeframe, since).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_transient_feed_failure_is_retried() {
        let broker = Arc::new(
            SimBroker::new(dec!(10000)).with_spec("EURUSD", SymbolSpec::fx_five_digit()),
        );
        let bar = Bar::new(0, 1.1, 1.101, 1.099, 1.1, 100.0);
        let mut inner = ReplayFeed::new();
        inner.load("EURUSD", vec![bar]).unwrap();
        inner.advance_to(0);
        let feed = Arc::new(FlakyFeed {
            inner,
            remaining_failures: AtomicUsize::new(2),
        });

        let mut engine = LiveEngine::new(
            Arc::clone(&broker),
            Arc::clone(&feed),
            fast_config(),
            vec![ribbon_context()],
        );
        engine.poll_once().await;

        // Two failures, third attempt serves the bar.
        assert_eq!(engine.contexts()[0].last_close_time(), Some(0));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let broker = Arc::new(SimBroker::new(dec!(10000)));
        let feed = Arc::new(ReplayFeed::new());
        let engine = LiveEngine::new(broker, feed, fast_config(), vec![]);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(engine.run(rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let trades = handle.await.unwrap();
        assert!(trades.is_empty());
    }
}
