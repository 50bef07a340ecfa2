//! Per-symbol position lifecycle.

use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use scalper_core::traits::PositionOutcome;
use scalper_core::types::{BrokerPosition, Direction, Signal};
use scalper_risk::SymbolSpec;

/// A position the engine considers open.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub ticket: Uuid,
    pub direction: Direction,
    pub volume: Decimal,
    pub entry_price: Decimal,
    pub stop_price: Decimal,
    pub target_price: Decimal,
    /// Close time of the bar the position was filled on, Unix ms
    pub opened_at: i64,
    /// Closed bars elapsed since the fill bar
    pub bars_held: usize,
}

impl OpenPosition {
    /// Exit price and outcome if the bar's range touches the stop or the
    /// target. The stop is checked first: without tick data the adverse
    /// move is assumed to have happened before the favorable one.
    pub fn exit_on_bar(&self, high: Decimal, low: Decimal) -> Option<(Decimal, PositionOutcome)> {
        match self.direction {
            Direction::Long if low <= self.stop_price => {
                Some((self.stop_price, PositionOutcome::StopLoss))
            }
            Direction::Long if high >= self.target_price => {
                Some((self.target_price, PositionOutcome::TakeProfit))
            }
            Direction::Short if high >= self.stop_price => {
                Some((self.stop_price, PositionOutcome::StopLoss))
            }
            Direction::Short if low <= self.target_price => {
                Some((self.target_price, PositionOutcome::TakeProfit))
            }
            _ => None,
        }
    }

    /// Signed PnL in account currency for a close at `exit`.
    pub fn pnl_at(&self, spec: &SymbolSpec, exit: Decimal) -> Decimal {
        let delta = match self.direction {
            Direction::Long => exit - self.entry_price,
            Direction::Short => self.entry_price - exit,
        };
        spec.price_move_value(delta, self.volume)
    }
}

/// Lifecycle state for one symbol's position.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    /// No position, no order in flight
    Flat,
    /// Entry decided, order not yet filled
    PendingOpen { signal: Signal, volume: Decimal },
    /// Filled and holding
    Open(OpenPosition),
    /// Close requested, broker confirmation outstanding
    Closing { ticket: Uuid },
}

/// Single source of truth for "is this symbol tradeable now".
///
/// Every transition is funneled through this tracker so a duplicate signal
/// can never stage a second entry, and a restarted process adopts what the
/// broker already holds instead of re-opening it.
#[derive(Debug)]
pub struct PositionTracker {
    symbol: String,
    state: PositionState,
}

impl PositionTracker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: PositionState::Flat,
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.state, PositionState::Flat)
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        match &self.state {
            PositionState::Open(position) => Some(position),
            _ => None,
        }
    }

    /// Stage an entry. Returns false (dropping the signal) unless flat.
    pub fn stage(&mut self, signal: Signal, volume: Decimal) -> bool {
        if !self.is_flat() {
            warn!(symbol = %self.symbol, "duplicate entry signal dropped");
            return false;
        }
        self.state = PositionState::PendingOpen { signal, volume };
        true
    }

    /// Take the staged entry out for execution, if any.
    pub fn take_pending(&mut self) -> Option<(Signal, Decimal)> {
        if let PositionState::PendingOpen { .. } = self.state {
            let state = std::mem::replace(&mut self.state, PositionState::Flat);
            if let PositionState::PendingOpen { signal, volume } = state {
                return Some((signal, volume));
            }
        }
        None
    }

    /// Abandon a staged entry (sizing skip, rejection, archive end).
    pub fn abort_pending(&mut self) -> bool {
        if matches!(self.state, PositionState::PendingOpen { .. }) {
            self.state = PositionState::Flat;
            return true;
        }
        false
    }

    /// Record a fill.
    pub fn activate(&mut self, position: OpenPosition) {
        debug!(symbol = %self.symbol, ticket = %position.ticket, "position open");
        self.state = PositionState::Open(position);
    }

    /// Count one closed bar of holding time. The fill bar itself does not
    /// count. Returns the updated count while open.
    pub fn note_bar(&mut self, bar_timestamp: i64) -> Option<usize> {
        if let PositionState::Open(position) = &mut self.state {
            if bar_timestamp > position.opened_at {
                position.bars_held += 1;
            }
            Some(position.bars_held)
        } else {
            None
        }
    }

    /// Move to `Closing` while a broker close request is outstanding.
    pub fn begin_close(&mut self) -> Option<OpenPosition> {
        if let PositionState::Open(position) = &self.state {
            let position = position.clone();
            self.state = PositionState::Closing {
                ticket: position.ticket,
            };
            return Some(position);
        }
        None
    }

    /// Finalize a close from `Open` or `Closing`; back to flat.
    pub fn mark_closed(&mut self) -> Option<OpenPosition> {
        match std::mem::replace(&mut self.state, PositionState::Flat) {
            PositionState::Open(position) => Some(position),
            PositionState::Closing { .. } => None,
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Adopt a position the broker reports that this tracker does not hold,
    /// as happens after a restart. Only valid while flat or pending.
    pub fn adopt(&mut self, position: &BrokerPosition) {
        debug!(symbol = %self.symbol, ticket = %position.ticket, "adopted broker position");
        self.state = PositionState::Open(OpenPosition {
            ticket: position.ticket,
            direction: position.direction,
            volume: position.volume,
            entry_price: position.entry_price,
            stop_price: position.stop_price,
            target_price: position.target_price,
            opened_at: position.opened_at.timestamp_millis(),
            bars_held: 0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal() -> Signal {
        Signal {
            symbol: "EURUSD".to_string(),
            direction: Direction::Long,
            entry_ref: 1.1000,
            stop_distance: 0.0020,
            target_distance: 0.0024,
            timestamp: 1000,
        }
    }

    fn open_long() -> OpenPosition {
        OpenPosition {
            ticket: Uuid::new_v4(),
            direction: Direction::Long,
            volume: dec!(1),
            entry_price: dec!(1.1000),
            stop_price: dec!(1.0980),
            target_price: dec!(1.1024),
            opened_at: 1000,
            bars_held: 0,
        }
    }

    #[test]
    fn test_duplicate_signal_dropped() {
        let mut tracker = PositionTracker::new("EURUSD");
        assert!(tracker.stage(signal(), dec!(1)));
        assert!(!tracker.stage(signal(), dec!(1)));
    }

    #[test]
    fn test_pending_roundtrip() {
        let mut tracker = PositionTracker::new("EURUSD");
        tracker.stage(signal(), dec!(2));

        let (taken, volume) = tracker.take_pending().unwrap();
        assert_eq!(taken.symbol, "EURUSD");
        assert_eq!(volume, dec!(2));
        assert!(tracker.is_flat());
        assert!(tracker.take_pending().is_none());
    }

    #[test]
    fn test_abort_pending() {
        let mut tracker = PositionTracker::new("EURUSD");
        tracker.stage(signal(), dec!(1));
        assert!(tracker.abort_pending());
        assert!(tracker.is_flat());
        assert!(!tracker.abort_pending());
    }

    #[test]
    fn test_fill_bar_does_not_count_as_held() {
        let mut tracker = PositionTracker::new("EURUSD");
        tracker.activate(open_long());

        assert_eq!(tracker.note_bar(1000), Some(0));
        assert_eq!(tracker.note_bar(2000), Some(1));
        assert_eq!(tracker.note_bar(3000), Some(2));
    }

    #[test]
    fn test_exit_stop_priority() {
        let position = open_long();

        // Only the target inside the bar.
        assert_eq!(
            position.exit_on_bar(dec!(1.1030), dec!(1.0990)),
            Some((dec!(1.1024), PositionOutcome::TakeProfit))
        );
        // Both inside: stop wins.
        assert_eq!(
            position.exit_on_bar(dec!(1.1030), dec!(1.0970)),
            Some((dec!(1.0980), PositionOutcome::StopLoss))
        );
        // Neither.
        assert_eq!(position.exit_on_bar(dec!(1.1010), dec!(1.0990)), None);
    }

    #[test]
    fn test_pnl_at() {
        let spec = SymbolSpec::fx_five_digit();
        let long = open_long();
        // +24 pips on 1 lot.
        assert_eq!(long.pnl_at(&spec, dec!(1.1024)), dec!(24.0));
        assert_eq!(long.pnl_at(&spec, dec!(1.0980)), dec!(-20.0));

        let short = OpenPosition {
            direction: Direction::Short,
            ..open_long()
        };
        assert_eq!(short.pnl_at(&spec, dec!(1.0980)), dec!(20.0));
    }

    #[test]
    fn test_short_exit_mirror() {
        let position = OpenPosition {
            direction: Direction::Short,
            stop_price: dec!(1.1020),
            target_price: dec!(1.0976),
            ..open_long()
        };

        assert_eq!(
            position.exit_on_bar(dec!(1.1010), dec!(1.0970)),
            Some((dec!(1.0976), PositionOutcome::TakeProfit))
        );
        assert_eq!(
            position.exit_on_bar(dec!(1.1025), dec!(1.0970)),
            Some((dec!(1.1020), PositionOutcome::StopLoss))
        );
    }

    #[test]
    fn test_close_lifecycle() {
        let mut tracker = PositionTracker::new("EURUSD");
        tracker.activate(open_long());

        let position = tracker.begin_close().unwrap();
        assert_eq!(position.volume, dec!(1));
        assert!(matches!(tracker.state(), PositionState::Closing { .. }));

        assert!(tracker.mark_closed().is_none());
        assert!(tracker.is_flat());
    }

    #[test]
    fn test_adopt_broker_position() {
        let mut tracker = PositionTracker::new("EURUSD");
        let broker_position = BrokerPosition {
            ticket: Uuid::new_v4(),
            symbol: "EURUSD".to_string(),
            direction: Direction::Short,
            volume: dec!(0.5),
            entry_price: dec!(1.1000),
            stop_price: dec!(1.1020),
            target_price: dec!(1.0976),
            opened_at: chrono::Utc::now(),
            strategy_tag: 777_001,
        };

        tracker.adopt(&broker_position);
        let open = tracker.open_position().unwrap();
        assert_eq!(open.ticket, broker_position.ticket);
        assert_eq!(open.direction, Direction::Short);
        assert_eq!(open.bars_held, 0);
    }
}
