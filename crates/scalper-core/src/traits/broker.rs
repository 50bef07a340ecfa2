//! Broker trait definition.

use crate::error::BrokerError;
use crate::types::{AccountState, BrokerPosition, OrderRequest, OrderTicket};
use async_trait::async_trait;
use uuid::Uuid;

/// Trait for broker connections.
///
/// One broker connection serves all configured symbols. Positions submitted
/// through this trait carry the strategy tag, and
/// [`Broker::open_positions`] filters by it, so the engine only ever
/// reconciles against its own trades on a shared account.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Get the current account state.
    async fn account(&self) -> Result<AccountState, BrokerError>;

    /// Submit a market order with attached stop-loss/take-profit.
    ///
    /// Returns a ticket on acceptance; a rejection resolves the symbol back
    /// to flat, no retry.
    async fn submit_order(&self, request: OrderRequest) -> Result<OrderTicket, BrokerError>;

    /// List open positions carrying the given strategy tag.
    async fn open_positions(&self, strategy_tag: u64) -> Result<Vec<BrokerPosition>, BrokerError>;

    /// Close an open position at market (manual exit path).
    async fn close_position(&self, ticket: Uuid) -> Result<(), BrokerError>;

    /// Get the broker name.
    fn name(&self) -> &str;
}
