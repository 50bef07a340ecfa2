//! Simulated broker for paper trading and forward replay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

use scalper_core::error::BrokerError;
use scalper_core::traits::{Broker, PositionOutcome};
use scalper_core::types::{
    AccountState, Bar, BrokerPosition, Direction, OrderRequest, OrderTicket,
};
use scalper_risk::SymbolSpec;

/// A position the simulator closed on a bar, reported back to the engine so
/// it can notify the owning strategy.
#[derive(Debug, Clone)]
pub struct SimClose {
    pub ticket: Uuid,
    pub symbol: String,
    pub strategy_tag: u64,
    pub direction: Direction,
    pub volume: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Decimal,
    pub outcome: PositionOutcome,
    pub closed_at: DateTime<Utc>,
}

/// In-memory broker that fills market orders instantly at the last posted
/// quote and manages attached stop-loss/take-profit server-side, the way a
/// real terminal does.
///
/// When a bar touches both the stop and the target, the stop wins: without
/// intra-bar tick data the conservative assumption is the adverse move
/// happened first.
pub struct SimBroker {
    account: Arc<Mutex<AccountState>>,
    positions: Arc<Mutex<HashMap<Uuid, BrokerPosition>>>,
    quotes: Arc<Mutex<HashMap<String, Decimal>>>,
    specs: HashMap<String, SymbolSpec>,
}

impl SimBroker {
    /// Create a simulated broker with the given starting capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            account: Arc::new(Mutex::new(AccountState::new(initial_capital))),
            positions: Arc::new(Mutex::new(HashMap::new())),
            quotes: Arc::new(Mutex::new(HashMap::new())),
            specs: HashMap::new(),
        }
    }

    /// Register a contract spec for a symbol. Unregistered symbols fall
    /// back to a five-digit FX spec.
    pub fn with_spec(mut self, symbol: impl Into<String>, spec: SymbolSpec) -> Self {
        self.specs.insert(symbol.into(), spec);
        self
    }

    fn spec_for(&self, symbol: &str) -> SymbolSpec {
        self.specs
            .get(symbol)
            .cloned()
            .unwrap_or_else(SymbolSpec::fx_five_digit)
    }

    fn signed_pnl(
        spec: &SymbolSpec,
        direction: Direction,
        entry: Decimal,
        exit: Decimal,
        volume: Decimal,
    ) -> Decimal {
        let delta = match direction {
            Direction::Long => exit - entry,
            Direction::Short => entry - exit,
        };
        spec.price_move_value(delta, volume)
    }

    /// Seed or advance the quote for a symbol without running exit checks.
    pub fn post_quote(&self, symbol: impl Into<String>, price: Decimal) {
        self.quotes.lock().unwrap().insert(symbol.into(), price);
    }

    /// Process one closed bar: advance the quote and close any positions
    /// whose attached stop or target the bar's range touched.
    pub fn on_bar(&self, bar: &Bar, symbol: &str) -> Result<Vec<SimClose>, BrokerError> {
        let high = Decimal::from_f64(bar.high)
            .ok_or_else(|| BrokerError::Internal(format!("unrepresentable high {}", bar.high)))?;
        let low = Decimal::from_f64(bar.low)
            .ok_or_else(|| BrokerError::Internal(format!("unrepresentable low {}", bar.low)))?;
        let close = Decimal::from_f64(bar.close)
            .ok_or_else(|| BrokerError::Internal(format!("unrepresentable close {}", bar.close)))?;

        self.post_quote(symbol, close);

        let mut closes = Vec::new();
        let mut positions = self.positions.lock().unwrap();

        let tickets: Vec<Uuid> = positions
            .values()
            .filter(|p| p.symbol == symbol)
            .map(|p| p.ticket)
            .collect();

        for ticket in tickets {
            let Some(position) = positions.get(&ticket) else {
                continue;
            };

            // Stop before target when both are inside the bar.
            let (exit_price, outcome) = match position.direction {
                Direction::Long if low <= position.stop_price => {
                    (position.stop_price, PositionOutcome::StopLoss)
                }
                Direction::Long if high >= position.target_price => {
                    (position.target_price, PositionOutcome::TakeProfit)
                }
                Direction::Short if high >= position.stop_price => {
                    (position.stop_price, PositionOutcome::StopLoss)
                }
                Direction::Short if low <= position.target_price => {
                    (position.target_price, PositionOutcome::TakeProfit)
                }
                _ => continue,
            };

            let position = positions.remove(&ticket).ok_or_else(|| {
                BrokerError::PositionNotFound(ticket.to_string())
            })?;
            let spec = self.spec_for(&position.symbol);
            let pnl = Self::signed_pnl(
                &spec,
                position.direction,
                position.entry_price,
                exit_price,
                position.volume,
            );
            self.account.lock().unwrap().apply_close(pnl);

            debug!(
                symbol = %position.symbol,
                ticket = %ticket,
                outcome = %outcome,
                %pnl,
                "simulated exit"
            );

            closes.push(SimClose {
                ticket,
                symbol: position.symbol.clone(),
                strategy_tag: position.strategy_tag,
                direction: position.direction,
                volume: position.volume,
                entry_price: position.entry_price,
                exit_price,
                pnl,
                outcome,
                closed_at: bar.datetime(),
            });
        }
        drop(positions);

        self.remark();
        Ok(closes)
    }

    /// Refresh equity from current quotes.
    fn remark(&self) {
        let positions = self.positions.lock().unwrap();
        let quotes = self.quotes.lock().unwrap();

        let mut unrealized = Decimal::ZERO;
        let mut exposure = Decimal::ZERO;
        for position in positions.values() {
            let Some(&quote) = quotes.get(&position.symbol) else {
                continue;
            };
            let spec = self.spec_for(&position.symbol);
            unrealized += Self::signed_pnl(
                &spec,
                position.direction,
                position.entry_price,
                quote,
                position.volume,
            );
            exposure += quote * position.volume;
        }

        self.account.lock().unwrap().mark(unrealized, exposure);
    }
}

#[async_trait]
impl Broker for SimBroker {
    async fn account(&self) -> Result<AccountState, BrokerError> {
        Ok(self.account.lock().unwrap().clone())
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<OrderTicket, BrokerError> {
        if request.volume <= Decimal::ZERO {
            return Err(BrokerError::Rejected(format!(
                "invalid volume {}",
                request.volume
            )));
        }

        let fill_price = {
            let quotes = self.quotes.lock().unwrap();
            *quotes.get(&request.symbol).ok_or_else(|| {
                BrokerError::Rejected(format!("no quote for {}", request.symbol))
            })?
        };

        // Stops must be on the correct side of the fill.
        let stops_valid = match request.direction {
            Direction::Long => {
                request.stop_price < fill_price && request.target_price > fill_price
            }
            Direction::Short => {
                request.stop_price > fill_price && request.target_price < fill_price
            }
        };
        if !stops_valid {
            return Err(BrokerError::Rejected(format!(
                "stop {} / target {} invalid against fill {}",
                request.stop_price, request.target_price, fill_price
            )));
        }

        let ticket = Uuid::new_v4();
        let now = Utc::now();
        let position = BrokerPosition {
            ticket,
            symbol: request.symbol.clone(),
            direction: request.direction,
            volume: request.volume,
            entry_price: fill_price,
            stop_price: request.stop_price,
            target_price: request.target_price,
            opened_at: now,
            strategy_tag: request.strategy_tag,
        };

        self.positions.lock().unwrap().insert(ticket, position);
        self.remark();

        debug!(symbol = %request.symbol, %ticket, direction = %request.direction, volume = %request.volume, "simulated fill");

        Ok(OrderTicket {
            id: ticket,
            symbol: request.symbol,
            direction: request.direction,
            volume: request.volume,
            submitted_at: now,
        })
    }

    async fn open_positions(&self, strategy_tag: u64) -> Result<Vec<BrokerPosition>, BrokerError> {
        let positions = self.positions.lock().unwrap();
        Ok(positions
            .values()
            .filter(|p| p.strategy_tag == strategy_tag)
            .cloned()
            .collect())
    }

    async fn close_position(&self, ticket: Uuid) -> Result<(), BrokerError> {
        let position = {
            let mut positions = self.positions.lock().unwrap();
            positions
                .remove(&ticket)
                .ok_or_else(|| BrokerError::PositionNotFound(ticket.to_string()))?
        };

        let exit_price = {
            let quotes = self.quotes.lock().unwrap();
            *quotes.get(&position.symbol).ok_or_else(|| {
                BrokerError::Internal(format!("no quote for {}", position.symbol))
            })?
        };

        let spec = self.spec_for(&position.symbol);
        let pnl = Self::signed_pnl(
            &spec,
            position.direction,
            position.entry_price,
            exit_price,
            position.volume,
        );
        self.account.lock().unwrap().apply_close(pnl);
        self.remark();

        Ok(())
    }

    fn name(&self) -> &str {
        "Sim Broker"
    }
}
