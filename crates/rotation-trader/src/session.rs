//! One trading session: clock gate, signal, reconcile, submit.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rotation_core::error::TradingError;
use rotation_core::traits::{Broker, MarketData};
use rotation_core::types::{InstrumentPair, Order, OrderRequest, TimeInForce};
use rotation_data::fetch_pair;
use rotation_strategy::{EvaluatedBar, PositionReconciler, SignalConfig, SignalEngine};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::gate::{ClockGate, SkipReason};

/// Where purchase capital comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CapitalSource {
    /// A fixed notional per purchase
    Fixed(Decimal),
    /// The account's current buying power
    BuyingPower,
}

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub instruments: InstrumentPair,
    pub signal: SignalConfig,
    /// First day of history fetched for the averages
    pub history_start: NaiveDate,
    pub capital: CapitalSource,
    pub entry_window_minutes: i64,
    pub fractional_shares: bool,
    pub time_in_force: TimeInForce,
    /// Compute and log the signal, but never touch holdings or orders
    pub dry_run: bool,
    /// Skip the market clock gate
    pub ignore_clock: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instruments: InstrumentPair::default(),
            signal: SignalConfig::default(),
            history_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            capital: CapitalSource::Fixed(Decimal::from(10_000)),
            entry_window_minutes: 15,
            fractional_shares: false,
            time_in_force: TimeInForce::Day,
            dry_run: false,
            ignore_clock: false,
        }
    }
}

/// How the session ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionOutcome {
    /// The clock gate held the session back
    Skipped(SkipReason),
    /// Signal computed, no broker state read
    DryRun,
    /// Holdings or buying power could not be read
    BrokerUnavailable(String),
    /// Holdings already match the signal
    Aligned,
    /// Orders were submitted; some may have failed
    Ordered,
}

/// Result of one submission.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub request: OrderRequest,
    pub order: Option<Order>,
    pub error: Option<String>,
}

impl OrderResult {
    pub fn is_ok(&self) -> bool {
        self.order.is_some()
    }
}

/// Everything a session decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Latest evaluated bar, absent when the gate skipped the session
    pub decision: Option<EvaluatedBar>,
    pub orders: Vec<OrderResult>,
}

impl SessionReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            outcome: SessionOutcome::Skipped(reason),
            decision: None,
            orders: Vec::new(),
        }
    }

    pub fn failed_orders(&self) -> usize {
        self.orders.iter().filter(|o| !o.is_ok()).count()
    }
}

/// Runs a session against a broker and a market data source.
pub struct TradingSession<'a> {
    config: SessionConfig,
    engine: SignalEngine,
    reconciler: PositionReconciler,
    broker: &'a dyn Broker,
    data: &'a dyn MarketData,
}

impl<'a> TradingSession<'a> {
    /// Create a session, validating the signal windows.
    pub fn new(
        config: SessionConfig,
        broker: &'a dyn Broker,
        data: &'a dyn MarketData,
    ) -> Result<Self, TradingError> {
        let engine = SignalEngine::new(config.signal.clone())?;
        let reconciler = PositionReconciler::new(config.instruments.clone())
            .with_fractional_shares(config.fractional_shares)
            .with_time_in_force(config.time_in_force);

        Ok(Self {
            config,
            engine,
            reconciler,
            broker,
            data,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run once with history up to `now`.
    ///
    /// Clock, data and signal errors are returned, as are holdings the
    /// reconciler cannot liquidate (short positions). Broker failures after
    /// the signal is known are logged and reported, never returned.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SessionReport, TradingError> {
        if self.config.ignore_clock {
            warn!("Market clock check disabled");
        } else {
            let clock = self.broker.get_clock().await?;
            if let Err(reason) = ClockGate::new(self.config.entry_window_minutes).check(&clock) {
                info!(%reason, next_close = %clock.next_close, "Not trading now");
                return Ok(SessionReport::skipped(reason));
            }
        }

        let decision = self.evaluate(now).await?;
        let signal = &decision.signal;
        info!(
            date = %decision.bar.date,
            price = decision.price(),
            fast = decision.averages.fast,
            medium = decision.averages.medium,
            slow = decision.averages.slow,
            signal = %signal.allocation,
            reason = signal.reason_or_empty(),
            "Market state"
        );

        let mut report = SessionReport {
            outcome: SessionOutcome::DryRun,
            decision: Some(decision.clone()),
            orders: Vec::new(),
        };

        if self.config.dry_run {
            info!("Dry run, no orders");
            return Ok(report);
        }

        let holdings = match self.broker.get_positions().await {
            Ok(holdings) => holdings,
            Err(e) => {
                error!(error = %e, "Could not read holdings, no orders placed");
                report.outcome = SessionOutcome::BrokerUnavailable(e.to_string());
                return Ok(report);
            }
        };
        let held: Vec<String> = holdings
            .iter()
            .map(|h| format!("{} {}", h.symbol, h.quantity))
            .collect();
        info!(holdings = ?held, "Current holdings");

        if self.reconciler.is_aligned(signal.allocation, &holdings) {
            info!(signal = %signal.allocation, "Holdings match signal, no trade");
            report.outcome = SessionOutcome::Aligned;
            return Ok(report);
        }

        let capital = match self.config.capital {
            CapitalSource::Fixed(amount) => amount,
            CapitalSource::BuyingPower => match self.broker.get_buying_power().await {
                Ok(amount) => amount,
                Err(e) => {
                    error!(error = %e, "Could not read buying power, no orders placed");
                    report.outcome = SessionOutcome::BrokerUnavailable(e.to_string());
                    return Ok(report);
                }
            },
        };

        let orders = self
            .reconciler
            .reconcile(signal.allocation, &holdings, capital, &decision.bar)?;
        report.outcome = if orders.is_empty() {
            SessionOutcome::Aligned
        } else {
            SessionOutcome::Ordered
        };

        for request in orders {
            let result = match self.broker.submit_order(request.clone()).await {
                Ok(order) => {
                    info!(%request, id = %order.id, status = ?order.status, "Order accepted");
                    OrderResult {
                        request,
                        order: Some(order),
                        error: None,
                    }
                }
                Err(e) => {
                    error!(%request, error = %e, "Order failed");
                    OrderResult {
                        request,
                        order: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.orders.push(result);
        }

        if report.failed_orders() > 0 {
            warn!(
                failed = report.failed_orders(),
                total = report.orders.len(),
                "Some orders failed"
            );
        }
        Ok(report)
    }

    /// Fetch the pair, evaluate it and return the latest bar.
    pub async fn evaluate(&self, now: DateTime<Utc>) -> Result<EvaluatedBar, TradingError> {
        let start = self
            .config
            .history_start
            .and_time(NaiveTime::default())
            .and_utc();
        let bars = fetch_pair(self.data, &self.config.instruments, start, now).await?;
        Ok(self.engine.latest(&bars)?)
    }
}
