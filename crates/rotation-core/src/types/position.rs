//! Holdings, simulated positions and account types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Allocation;

/// A holding as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Symbol
    pub symbol: String,
    /// Number of shares
    pub quantity: Decimal,
    /// Current market price, when the broker reports one
    pub current_price: Option<Decimal>,
    /// Market value, when the broker reports one
    pub market_value: Option<Decimal>,
}

impl Holding {
    /// Create a holding with just a quantity.
    pub fn new(symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            current_price: None,
            market_value: None,
        }
    }

    /// Attach a market price and derived value.
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.current_price = Some(price);
        self.market_value = Some(price * self.quantity);
        self
    }

    /// Check if the holding is flat (no shares).
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// Simulated holding state used by the backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub allocation: Allocation,
    /// Shares of the held instrument, zero in cash
    pub shares: Decimal,
    /// Notional value at the last valuation
    pub value: Decimal,
}

impl Position {
    /// All cash.
    pub fn cash(value: Decimal) -> Self {
        Self {
            allocation: Allocation::Cash,
            shares: Decimal::ZERO,
            value: value.max(Decimal::ZERO),
        }
    }

    /// Invest `value` into an instrument at `price`.
    ///
    /// Falls back to cash when the allocation is cash or the price is not positive.
    pub fn invested(allocation: Allocation, value: Decimal, price: Decimal) -> Self {
        if !allocation.is_invested() || price <= Decimal::ZERO {
            return Self::cash(value);
        }
        let value = value.max(Decimal::ZERO);
        Self {
            allocation,
            shares: value / price,
            value,
        }
    }

    /// Revalue at a new price of the held instrument. Cash is unchanged.
    pub fn mark(&mut self, price: Decimal) {
        if self.allocation.is_invested() {
            self.value = (self.shares * price).max(Decimal::ZERO);
        }
    }

    pub fn is_cash(&self) -> bool {
        self.allocation == Allocation::Cash
    }
}

/// Account balances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Available cash
    pub cash: Decimal,
    /// Buying power (may differ from cash due to margin)
    pub buying_power: Decimal,
    /// Total equity (cash + market value of positions)
    pub equity: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_holding_with_price() {
        let holding = Holding::new("TQQQ", dec!(100)).with_price(dec!(50.5));
        assert_eq!(holding.market_value, Some(dec!(5050.0)));
        assert!(!holding.is_flat());
        assert!(Holding::new("SQQQ", Decimal::ZERO).is_flat());
    }

    #[test]
    fn test_cash_position_has_no_shares() {
        let position = Position::cash(dec!(10000));
        assert!(position.is_cash());
        assert_eq!(position.shares, Decimal::ZERO);
        assert_eq!(position.value, dec!(10000));
    }

    #[test]
    fn test_invest_and_mark() {
        let mut position = Position::invested(Allocation::Bull, dec!(10000), dec!(50));
        assert_eq!(position.shares, dec!(200));

        position.mark(dec!(55));
        assert_eq!(position.value, dec!(11000));
    }

    #[test]
    fn test_invest_in_cash_stays_cash() {
        let position = Position::invested(Allocation::Cash, dec!(500), dec!(10));
        assert!(position.is_cash());
        assert_eq!(position.shares, Decimal::ZERO);

        let position = Position::invested(Allocation::Bear, dec!(500), Decimal::ZERO);
        assert!(position.is_cash());
    }

    #[test]
    fn test_value_never_negative() {
        let position = Position::cash(dec!(-5));
        assert_eq!(position.value, Decimal::ZERO);
    }
}
