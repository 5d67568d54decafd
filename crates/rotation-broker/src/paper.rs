//! In-memory paper broker.
//!
//! Fills every accepted order immediately at the configured price for its
//! symbol. The clock is whatever the caller sets, which makes it the
//! collaborator of choice for session tests and dry runs without a network.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rotation_core::error::BrokerError;
use rotation_core::traits::Broker;
use rotation_core::types::{Account, Holding, MarketClock, Order, OrderRequest, Side};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug)]
struct PaperState {
    cash: Decimal,
    holdings: Vec<Holding>,
    prices: HashMap<String, Decimal>,
    clock: MarketClock,
    rejected: HashSet<String>,
    positions_unavailable: bool,
    submitted: Vec<Order>,
}

/// Paper trading broker for simulation.
#[derive(Debug)]
pub struct PaperBroker {
    state: Mutex<PaperState>,
}

impl PaperBroker {
    /// Create a paper broker holding only cash. The clock starts open with
    /// ten minutes to the close.
    pub fn new(cash: Decimal) -> Self {
        let now = Utc::now();
        Self {
            state: Mutex::new(PaperState {
                cash,
                holdings: Vec::new(),
                prices: HashMap::new(),
                clock: MarketClock {
                    timestamp: now,
                    is_open: true,
                    next_open: now + Duration::days(1),
                    next_close: now + Duration::minutes(10),
                },
                rejected: HashSet::new(),
                positions_unavailable: false,
                submitted: Vec::new(),
            }),
        }
    }

    /// Add a holding.
    pub fn with_holding(self, symbol: &str, quantity: Decimal) -> Self {
        self.lock().holdings.push(Holding::new(symbol, quantity));
        self
    }

    /// Set the fill price for a symbol.
    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.lock().prices.insert(symbol.to_uppercase(), price);
        self
    }

    pub fn with_clock(self, clock: MarketClock) -> Self {
        self.lock().clock = clock;
        self
    }

    /// Reject every order for `symbol`.
    pub fn rejecting(self, symbol: &str) -> Self {
        self.lock().rejected.insert(symbol.to_uppercase());
        self
    }

    /// Make `get_positions` fail.
    pub fn without_positions(self) -> Self {
        self.lock().positions_unavailable = true;
        self
    }

    /// Orders accepted so far, in submission order.
    pub fn submitted_orders(&self) -> Vec<Order> {
        self.lock().submitted.clone()
    }

    /// Current holdings snapshot.
    pub fn holdings(&self) -> Vec<Holding> {
        self.lock().holdings.clone()
    }

    pub fn cash(&self) -> Decimal {
        self.lock().cash
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        // State stays consistent across a panicking test thread.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PaperState {
    fn apply_fill(&mut self, symbol: &str, side: Side, quantity: Decimal) {
        let delta = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };

        match self
            .holdings
            .iter_mut()
            .find(|h| h.symbol.eq_ignore_ascii_case(symbol))
        {
            Some(holding) => holding.quantity += delta,
            None => self.holdings.push(Holding::new(symbol, delta)),
        }
        self.holdings.retain(|h| !h.is_flat());
    }

    fn equity(&self) -> Decimal {
        self.holdings.iter().fold(self.cash, |acc, h| {
            let price = self
                .prices
                .get(&h.symbol.to_uppercase())
                .copied()
                .unwrap_or_default();
            acc + price * h.quantity
        })
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn get_account(&self) -> Result<Account, BrokerError> {
        let state = self.lock();
        Ok(Account {
            cash: state.cash,
            buying_power: state.cash.max(Decimal::ZERO),
            equity: state.equity(),
        })
    }

    async fn get_positions(&self) -> Result<Vec<Holding>, BrokerError> {
        let state = self.lock();
        if state.positions_unavailable {
            return Err(BrokerError::Connection("paper positions unavailable".into()));
        }
        Ok(state
            .holdings
            .iter()
            .map(|h| match state.prices.get(&h.symbol.to_uppercase()) {
                Some(&price) => h.clone().with_price(price),
                None => h.clone(),
            })
            .collect())
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError> {
        let mut state = self.lock();
        let key = request.symbol.to_uppercase();

        if state.rejected.contains(&key) {
            return Err(BrokerError::OrderRejected(format!(
                "{} is not tradable",
                request.symbol
            )));
        }
        if request.quantity <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected(format!(
                "quantity {} must be positive",
                request.quantity
            )));
        }

        let mut order = Order::from_request(&request);
        state.apply_fill(&request.symbol, request.side, request.quantity);

        if let Some(&price) = state.prices.get(&key) {
            let value = price * request.quantity;
            match request.side {
                Side::Buy => state.cash -= value,
                Side::Sell => state.cash += value,
            }
            order.fill(price);
            info!(%request, %price, "Paper fill");
        } else {
            debug!(%request, "Paper order accepted without a price");
        }

        state.submitted.push(order.clone());
        Ok(order)
    }

    async fn get_clock(&self) -> Result<MarketClock, BrokerError> {
        Ok(self.lock().clock)
    }

    fn name(&self) -> &str {
        "Paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::types::OrderStatus;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_buy_and_sell_update_holdings_and_cash() {
        let broker = PaperBroker::new(dec!(10000))
            .with_holding("SQQQ", dec!(100))
            .with_price("SQQQ", dec!(10))
            .with_price("TQQQ", dec!(50));

        let sell = broker
            .submit_order(OrderRequest::market("SQQQ", Side::Sell, dec!(100)))
            .await
            .unwrap();
        assert!(sell.is_filled());

        broker
            .submit_order(OrderRequest::market("TQQQ", Side::Buy, dec!(20)))
            .await
            .unwrap();

        let holdings = broker.get_positions().await.unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "TQQQ");
        assert_eq!(holdings[0].quantity, dec!(20));
        assert_eq!(holdings[0].market_value, Some(dec!(1000)));
        assert_eq!(broker.cash(), dec!(10000));

        let account = broker.get_account().await.unwrap();
        assert_eq!(account.equity, dec!(11000));
    }

    #[tokio::test]
    async fn test_order_without_price_stays_pending() {
        let broker = PaperBroker::new(dec!(1000));
        let order = broker
            .submit_order(OrderRequest::market("QQQ", Side::Buy, dec!(1)))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(broker.holdings().len(), 1);
        assert_eq!(broker.cash(), dec!(1000));
    }

    #[tokio::test]
    async fn test_rejections() {
        let broker = PaperBroker::new(dec!(1000)).rejecting("tqqq");

        let rejected = broker
            .submit_order(OrderRequest::market("TQQQ", Side::Buy, dec!(1)))
            .await;
        assert!(matches!(rejected, Err(BrokerError::OrderRejected(_))));

        let zero = broker
            .submit_order(OrderRequest::market("SQQQ", Side::Buy, dec!(0)))
            .await;
        assert!(matches!(zero, Err(BrokerError::OrderRejected(_))));
        assert!(broker.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_positions_unavailable() {
        let broker = PaperBroker::new(dec!(1000)).without_positions();
        assert!(broker.get_positions().await.is_err());
    }

    #[tokio::test]
    async fn test_default_clock_is_inside_entry_window() {
        let clock = PaperBroker::new(dec!(0)).get_clock().await.unwrap();
        assert!(clock.is_open);
        assert!(clock.minutes_to_close() <= 15.0);
    }
}
