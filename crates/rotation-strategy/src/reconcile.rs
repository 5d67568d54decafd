//! Position reconciliation.
//!
//! Turns today's target allocation and the broker's holdings into the
//! orders needed to get from one to the other: liquidations first, then at
//! most one purchase of the target instrument.

use rotation_core::{
    error::StrategyError,
    types::{Allocation, Holding, InstrumentPair, OrderRequest, PriceBar, Side, TimeInForce},
};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

/// Decimal places kept when fractional shares are enabled.
const FRACTIONAL_DP: u32 = 4;

/// Computes order intents. Has no side effects.
#[derive(Debug, Clone)]
pub struct PositionReconciler {
    instruments: InstrumentPair,
    fractional_shares: bool,
    time_in_force: TimeInForce,
}

impl PositionReconciler {
    /// Create a reconciler trading whole shares with day orders.
    pub fn new(instruments: InstrumentPair) -> Self {
        Self {
            instruments,
            fractional_shares: false,
            time_in_force: TimeInForce::Day,
        }
    }

    /// Allow fractional purchase quantities.
    pub fn with_fractional_shares(mut self, enabled: bool) -> Self {
        self.fractional_shares = enabled;
        self
    }

    /// Set the time in force for every emitted order.
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    pub fn instruments(&self) -> &InstrumentPair {
        &self.instruments
    }

    /// Whether holdings already match the target: a long position in the
    /// target instrument is the only holding, or the target is cash and
    /// nothing is held.
    pub fn is_aligned(&self, target: Allocation, holdings: &[Holding]) -> bool {
        let mut held = holdings.iter().filter(|h| !h.is_flat());
        if !target.is_invested() {
            return held.next().is_none();
        }
        match (held.next(), held.next()) {
            (Some(only), None) => self.is_target(target, only),
            _ => false,
        }
    }

    fn is_target(&self, target: Allocation, holding: &Holding) -> bool {
        holding.quantity > Decimal::ZERO
            && self.instruments.allocation_of(&holding.symbol) == Some(target)
    }

    /// Orders that move `holdings` to `target`.
    ///
    /// Every holding other than the target instrument is sold in full, in
    /// the order given. A purchase of the target follows unless it is
    /// already held, sized as `capital` divided by the target's close on `bar`.
    /// Short holdings cannot be closed by a sell and are rejected as
    /// malformed.
    pub fn reconcile(
        &self,
        target: Allocation,
        holdings: &[Holding],
        capital: Decimal,
        bar: &PriceBar,
    ) -> Result<Vec<OrderRequest>, StrategyError> {
        if let Some(short) = holdings.iter().find(|h| h.quantity < Decimal::ZERO) {
            return Err(StrategyError::MalformedInput {
                date: bar.date.to_string(),
                reason: format!("short holding {} {}", short.symbol, short.quantity),
            });
        }

        if self.is_aligned(target, holdings) {
            debug!(%target, "Holdings already aligned");
            return Ok(vec![]);
        }

        let target_symbol = self.instruments.symbol_for(target);
        let mut orders = Vec::new();
        let mut target_held = false;

        for holding in holdings.iter().filter(|h| !h.is_flat()) {
            if self.is_target(target, holding) {
                target_held = true;
                continue;
            }
            debug!(
                symbol = %holding.symbol,
                quantity = %holding.quantity,
                leg = ?self.instruments.allocation_of(&holding.symbol),
                "Liquidating"
            );
            orders.push(
                OrderRequest::market(&holding.symbol, Side::Sell, holding.quantity)
                    .with_time_in_force(self.time_in_force),
            );
        }

        if let Some(symbol) = target_symbol.filter(|_| !target_held) {
            let price = self
                .instruments
                .close_for(target, bar)
                .ok_or_else(|| StrategyError::InvalidConfig(format!("No price for {}", target)))?;
            let quantity = self.size(capital, price, bar)?;

            if quantity.is_zero() {
                warn!(%symbol, %capital, price, "Capital buys no shares, skipping purchase");
            } else {
                orders.push(
                    OrderRequest::market(symbol, Side::Buy, quantity)
                        .with_time_in_force(self.time_in_force),
                );
            }
        }

        debug!(%target, orders = orders.len(), "Reconciled holdings");
        Ok(orders)
    }

    fn size(&self, capital: Decimal, price: f64, bar: &PriceBar) -> Result<Decimal, StrategyError> {
        let malformed = |reason: String| StrategyError::MalformedInput {
            date: bar.date.to_string(),
            reason,
        };

        let price = Decimal::try_from(price)
            .map_err(|e| malformed(format!("price {} is not representable: {}", price, e)))?;
        if price <= Decimal::ZERO {
            return Err(malformed(format!("price {} is not positive", price)));
        }
        if capital <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let raw = capital
            .checked_div(price)
            .ok_or_else(|| malformed(format!("{} / {} overflows", capital, price)))?;

        Ok(if self.fractional_shares {
            raw.round_dp_with_strategy(FRACTIONAL_DP, RoundingStrategy::ToZero)
        } else {
            raw.trunc()
        })
    }
}
