//! Broker trait definition.

use crate::error::BrokerError;
use crate::types::{Account, Holding, MarketClock, Order, OrderRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for brokerage integrations.
///
/// The trading session only needs holdings, the market clock and order
/// submission, so that is all a broker has to provide.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Get account balances.
    async fn get_account(&self) -> Result<Account, BrokerError>;

    /// Get all current holdings, in the order the broker reports them.
    async fn get_positions(&self) -> Result<Vec<Holding>, BrokerError>;

    /// Submit a market order.
    ///
    /// # Returns
    /// The created order with an ID and initial status
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError>;

    /// Get the market clock.
    async fn get_clock(&self) -> Result<MarketClock, BrokerError>;

    /// Get the current buying power.
    async fn get_buying_power(&self) -> Result<Decimal, BrokerError> {
        let account = self.get_account().await?;
        Ok(account.buying_power)
    }

    /// Get the broker name.
    fn name(&self) -> &str;
}
