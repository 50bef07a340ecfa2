//! Per-symbol evaluation context shared by both harnesses.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use scalper_core::error::{EngineError, EngineResult, SizingError};
use scalper_core::traits::{PositionOutcome, Strategy};
use scalper_core::types::{Bar, BarSeries, Signal, Timeframe};
use scalper_risk::{RiskSizer, SymbolSpec};

use crate::lifecycle::PositionTracker;

/// A fully sized entry decision, ready for execution. The fill price is the
/// harness's business: the backtest fills at the next bar's open, the live
/// engine at market.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub signal: Signal,
    pub volume: Decimal,
}

impl OrderIntent {
    /// Absolute stop price for a given fill price.
    pub fn stop_price(&self, fill: Decimal) -> EngineResult<Decimal> {
        decimal(self.signal.stop_price(price_f64(fill)?))
    }

    /// Absolute target price for a given fill price.
    pub fn target_price(&self, fill: Decimal) -> EngineResult<Decimal> {
        decimal(self.signal.target_price(price_f64(fill)?))
    }
}

fn decimal(value: f64) -> EngineResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| EngineError::Internal(format!("unrepresentable price {}", value)))
}

fn price_f64(value: Decimal) -> EngineResult<f64> {
    use rust_decimal::prelude::ToPrimitive;
    value
        .to_f64()
        .ok_or_else(|| EngineError::Internal(format!("unrepresentable price {}", value)))
}

/// Everything needed to evaluate one symbol: its strategy, bar history,
/// contract spec, sizer and position tracker. Both harnesses call
/// [`SymbolContext::on_closed_bar`] with the same bars, which is what makes
/// their decisions identical.
pub struct SymbolContext {
    symbol: String,
    timeframe: Timeframe,
    strategy: Box<dyn Strategy>,
    series: BarSeries,
    spec: SymbolSpec,
    sizer: RiskSizer,
    pub tracker: PositionTracker,
}

/// Bar history kept per symbol; enough for any sane warm-up.
const SERIES_CAPACITY: usize = 1000;

impl SymbolContext {
    pub fn new(
        timeframe: Timeframe,
        strategy: Box<dyn Strategy>,
        spec: SymbolSpec,
        sizer: RiskSizer,
    ) -> Self {
        let symbol = strategy.symbol().to_string();
        Self {
            series: BarSeries::with_capacity(symbol.clone(), timeframe, SERIES_CAPACITY),
            tracker: PositionTracker::new(symbol.clone()),
            symbol,
            timeframe,
            strategy,
            spec,
            sizer,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn spec(&self) -> &SymbolSpec {
        &self.spec
    }

    pub fn last_close_time(&self) -> Option<i64> {
        self.series.last_close_time()
    }

    pub fn strategy_state(&self) -> scalper_core::traits::StrategyState {
        self.strategy.state()
    }

    /// Feed one closed bar through the decision path.
    ///
    /// Appends the bar (silently dropping stale timestamps), lets the
    /// strategy evaluate, and sizes any resulting signal against current
    /// equity. Returns a ready-to-execute intent, already staged in the
    /// tracker; sizing skips resolve the strategy back to flat.
    pub fn on_closed_bar(&mut self, bar: Bar, equity: Decimal) -> EngineResult<Option<OrderIntent>> {
        if !self.series.push(bar) {
            warn!(symbol = %self.symbol, timestamp = bar.timestamp, "out-of-order bar dropped");
            return Ok(None);
        }

        let Some(signal) = self.strategy.on_bar(&self.series) else {
            return Ok(None);
        };

        if !self.tracker.is_flat() {
            // The tracker is authoritative; a signal that races a live
            // position is dropped and the strategy resolved back to flat.
            warn!(symbol = %self.symbol, "signal while not flat dropped");
            self.strategy.on_position_closed(PositionOutcome::Rejected);
            return Ok(None);
        }

        let stop_distance = decimal(signal.stop_distance)?;
        let volume = match self.sizer.size(equity, stop_distance, &self.spec) {
            Ok(volume) => volume,
            Err(e @ (SizingError::ZeroStopDistance | SizingError::BelowMinimumVolume { .. })) => {
                info!(symbol = %self.symbol, reason = %e, "entry skipped at sizing");
                self.strategy.on_position_closed(PositionOutcome::Rejected);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        self.tracker.stage(signal.clone(), volume);
        Ok(Some(OrderIntent { signal, volume }))
    }

    /// Report a closed or abandoned position back to the strategy.
    pub fn notify_closed(&mut self, outcome: PositionOutcome) {
        self.strategy.on_position_closed(outcome);
    }

    /// Reset strategy, series and tracker for a fresh run.
    pub fn reset(&mut self) {
        self.strategy.reset();
        self.series.clear();
        self.tracker = PositionTracker::new(self.symbol.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use scalper_core::traits::StrategyState;
    use scalper_core::types::Direction;

    /// Emits a fixed long signal on every bar once `fire_from` bars have
    /// been seen, until a position is reported open.
    struct FixedSignal {
        fire_from: usize,
        bars_seen: usize,
        in_position: bool,
        stop_distance: f64,
    }

    impl FixedSignal {
        fn new(fire_from: usize, stop_distance: f64) -> Self {
            Self {
                fire_from,
                bars_seen: 0,
                in_position: false,
                stop_distance,
            }
        }
    }

    impl Strategy for FixedSignal {
        fn name(&self) -> &str {
            "fixed"
        }

        fn symbol(&self) -> &str {
            "EURUSD"
        }

        fn on_bar(&mut self, series: &BarSeries) -> Option<Signal> {
            self.bars_seen += 1;
            if self.in_position || self.bars_seen < self.fire_from {
                return None;
            }
            self.in_position = true;
            let bar = series.last()?;
            Some(Signal {
                symbol: "EURUSD".to_string(),
                direction: Direction::Long,
                entry_ref: bar.close,
                stop_distance: self.stop_distance,
                target_distance: self.stop_distance * 1.2,
                timestamp: bar.timestamp,
            })
        }

        fn on_position_closed(&mut self, _outcome: PositionOutcome) {
            self.in_position = false;
        }

        fn reset(&mut self) {
            self.bars_seen = 0;
            self.in_position = false;
        }

        fn state(&self) -> StrategyState {
            StrategyState::default()
        }

        fn warmup_period(&self) -> usize {
            self.fire_from
        }
    }

    fn context(stop_distance: f64) -> SymbolContext {
        SymbolContext::new(
            Timeframe::Minute5,
            Box::new(FixedSignal::new(2, stop_distance)),
            SymbolSpec::fx_five_digit(),
            RiskSizer::new(dec!(1)).unwrap(),
        )
    }

    fn bar(ts: i64) -> Bar {
        Bar::new(ts, 1.1, 1.101, 1.099, 1.1, 100.0)
    }

    #[test]
    fn test_intent_sized_and_staged() {
        let mut ctx = context(0.0020);

        assert!(ctx.on_closed_bar(bar(1000), dec!(10000)).unwrap().is_none());
        let intent = ctx.on_closed_bar(bar(2000), dec!(10000)).unwrap().unwrap();

        // 1% of 10000 over a 20-pip stop at 0.1/tick: 5 lots.
        assert_eq!(intent.volume, dec!(5.00));
        assert!(!ctx.tracker.is_flat());
    }

    #[test]
    fn test_zero_stop_skips_and_resolves_flat() {
        let mut ctx = context(0.0);

        ctx.on_closed_bar(bar(1000), dec!(10000)).unwrap();
        let intent = ctx.on_closed_bar(bar(2000), dec!(10000)).unwrap();

        assert!(intent.is_none());
        assert!(ctx.tracker.is_flat());

        // The strategy was resolved back to flat, so the next bar can fire
        // again with a valid stop.
        let result = ctx.on_closed_bar(bar(3000), dec!(10000)).unwrap();
        assert!(result.is_none()); // still zero stop, skipped again
    }

    #[test]
    fn test_below_minimum_skips() {
        let mut ctx = context(0.0500);

        ctx.on_closed_bar(bar(1000), dec!(50)).unwrap();
        // 0.1% of tiny equity over a 500-pip stop computes under 0.01 lots.
        let intent = ctx.on_closed_bar(bar(2000), dec!(50)).unwrap();
        assert!(intent.is_none());
        assert!(ctx.tracker.is_flat());
    }

    #[test]
    fn test_stale_bar_dropped() {
        let mut ctx = context(0.0020);
        ctx.on_closed_bar(bar(1000), dec!(10000)).unwrap();

        let result = ctx.on_closed_bar(bar(1000), dec!(10000)).unwrap();
        assert!(result.is_none());
        // The duplicate did not advance the strategy's bar count.
        let intent = ctx.on_closed_bar(bar(2000), dec!(10000)).unwrap();
        assert!(intent.is_some());
    }

    #[test]
    fn test_stop_and_target_prices() {
        let intent = OrderIntent {
            signal: Signal {
                symbol: "EURUSD".to_string(),
                direction: Direction::Long,
                entry_ref: 1.1000,
                stop_distance: 0.0020,
                target_distance: 0.0024,
                timestamp: 0,
            },
            volume: dec!(1),
        };

        let stop = intent.stop_price(dec!(1.1002)).unwrap();
        let target = intent.target_price(dec!(1.1002)).unwrap();
        assert!((stop - dec!(1.0982)).abs() < dec!(0.000001));
        assert!((target - dec!(1.1026)).abs() < dec!(0.000001));
    }
}
