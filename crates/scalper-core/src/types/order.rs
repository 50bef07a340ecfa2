//! Order and broker-side position types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Direction;

/// Request for a market order with attached stop-loss and take-profit,
/// tagged with the strategy identifier so the engine can later recognize
/// its own positions on a shared account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol to trade
    pub symbol: String,
    /// Long or short
    pub direction: Direction,
    /// Volume in lots
    pub volume: Decimal,
    /// Stop-loss price
    pub stop_price: Decimal,
    /// Take-profit price
    pub target_price: Decimal,
    /// Strategy identifier (magic number)
    pub strategy_tag: u64,
    /// Client-provided order ID
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    /// Create a market order request.
    pub fn market(
        symbol: impl Into<String>,
        direction: Direction,
        volume: Decimal,
        stop_price: Decimal,
        target_price: Decimal,
        strategy_tag: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            volume,
            stop_price,
            target_price,
            strategy_tag,
            client_order_id: None,
        }
    }

    /// Set a client order ID.
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// Handle returned by the broker for a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    /// Broker-side order/position ID
    pub id: Uuid,
    /// Symbol traded
    pub symbol: String,
    /// Long or short
    pub direction: Direction,
    /// Volume in lots
    pub volume: Decimal,
    /// When the order was accepted
    pub submitted_at: DateTime<Utc>,
}

/// A position as reported by the broker, used for reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    /// Broker-side position ID
    pub ticket: Uuid,
    /// Symbol
    pub symbol: String,
    /// Long or short
    pub direction: Direction,
    /// Volume in lots
    pub volume: Decimal,
    /// Fill price
    pub entry_price: Decimal,
    /// Attached stop-loss price
    pub stop_price: Decimal,
    /// Attached take-profit price
    pub target_price: Decimal,
    /// When the position was opened
    pub opened_at: DateTime<Utc>,
    /// Strategy identifier (magic number)
    pub strategy_tag: u64,
}
