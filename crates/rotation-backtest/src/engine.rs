//! Backtesting engine.
//!
//! Replays an evaluated series: a transition signalled on one bar executes
//! at the next bar's open, and the position is marked to every close.

use rotation_core::types::{Allocation, InstrumentPair, Position, PriceBar, Side};
use rotation_strategy::EvaluatedBar;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::report::BacktestReport;
use crate::statistics::{BacktestStats, TradeRecord};

/// Backtest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Flat commission charged on every fill
    pub commission_per_trade: Decimal,
    /// Symbols used in the trade log
    pub instruments: InstrumentPair,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            commission_per_trade: Decimal::ZERO,
            instruments: InstrumentPair::default(),
        }
    }
}

/// Backtesting engine.
pub struct BacktestEngine {
    config: BacktestConfig,
}

/// Capital committed to the open position, for round-trip P&L.
struct OpenTrade {
    cost: Decimal,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run a backtest over bars produced by the signal engine.
    pub fn run(&self, bars: &[EvaluatedBar]) -> BacktestReport {
        let mut stats = BacktestStats::new(self.config.initial_capital);
        let mut position = Position::cash(self.config.initial_capital);
        let mut open_trade: Option<OpenTrade> = None;
        let mut scheduled: Option<(Allocation, Option<String>)> = None;
        let mut pending = None;

        for (i, evaluated) in bars.iter().enumerate() {
            let bar = &evaluated.bar;

            if let Some((target, reason)) = scheduled.take() {
                self.transition(&mut position, &mut open_trade, &mut stats, target, reason, bar);
            }

            if let Some(close) = self.config.instruments.close_for(position.allocation, bar) {
                position.mark(to_decimal(close));
            }
            stats.record_equity(bar.date, position.allocation, position.value);

            let target = evaluated.signal.allocation;
            if target != position.allocation {
                if i + 1 < bars.len() {
                    debug!(
                        date = %bar.date,
                        from = %position.allocation,
                        to = %target,
                        "Transition scheduled"
                    );
                    scheduled = Some((target, evaluated.signal.reason.clone()));
                } else {
                    pending = Some(target);
                }
            }
        }

        stats.finalize(position.value);

        info!(
            bars = bars.len(),
            trades = stats.total_trades,
            final_equity = %stats.final_equity,
            "Backtest complete"
        );

        BacktestReport {
            config: self.config.clone(),
            start: bars.first().map(|b| b.bar.date),
            end: bars.last().map(|b| b.bar.date),
            final_allocation: position.allocation,
            pending,
            stats,
        }
    }

    /// Move the whole position into `target` at this bar's open.
    fn transition(
        &self,
        position: &mut Position,
        open_trade: &mut Option<OpenTrade>,
        stats: &mut BacktestStats,
        target: Allocation,
        reason: Option<String>,
        bar: &PriceBar,
    ) {
        let instruments = &self.config.instruments;
        let commission = self.config.commission_per_trade;

        if let (Some(symbol), Some(open)) = (
            instruments.symbol_for(position.allocation),
            instruments.open_for(position.allocation, bar),
        ) {
            let price = to_decimal(open);
            let proceeds = position.shares * price;
            let cash = (proceeds - commission).max(Decimal::ZERO);
            let pnl = open_trade.take().map(|t| cash - t.cost);

            stats.add_trade(TradeRecord {
                date: bar.date,
                symbol: symbol.to_string(),
                side: Side::Sell,
                quantity: position.shares,
                price,
                value: proceeds,
                commission,
                reason: reason.clone(),
                pnl,
            });
            *position = Position::cash(cash);
        }

        if let (Some(symbol), Some(open)) = (
            instruments.symbol_for(target),
            instruments.open_for(target, bar),
        ) {
            let price = to_decimal(open);
            let cost = position.value;
            let invested = (cost - commission).max(Decimal::ZERO);
            *position = Position::invested(target, invested, price);

            if position.allocation == target {
                stats.add_trade(TradeRecord {
                    date: bar.date,
                    symbol: symbol.to_string(),
                    side: Side::Buy,
                    quantity: position.shares,
                    price,
                    value: invested,
                    commission,
                    reason,
                    pnl: None,
                });
                *open_trade = Some(OpenTrade { cost });
            }
        }
    }
}

fn to_decimal(price: f64) -> Decimal {
    Decimal::try_from(price).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rotation_core::types::{MovingAverages, Signal};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    /// Bar with identical open and close for both instruments.
    fn eb(n: u32, bull: f64, bear: f64, alloc: Allocation) -> EvaluatedBar {
        EvaluatedBar {
            bar: PriceBar::new(day(n), bull, bull, bear, bear),
            averages: MovingAverages::new(bull, bull, bull),
            signal: Signal::new(alloc, "test"),
        }
    }

    fn engine() -> BacktestEngine {
        BacktestEngine::new(BacktestConfig::default())
    }

    #[test]
    fn test_all_cash_keeps_capital() {
        let bars: Vec<_> = (0..5).map(|n| eb(n, 50.0, 10.0, Allocation::Cash)).collect();
        let report = engine().run(&bars);

        assert_eq!(report.stats.final_equity, dec!(10000));
        assert_eq!(report.stats.total_trades, 0);
        assert_eq!(report.stats.equity_curve.len(), 5);
        assert!(report.pending.is_none());
    }

    #[test]
    fn test_transition_executes_next_open() {
        let bars = vec![
            eb(0, 50.0, 10.0, Allocation::Bull),
            EvaluatedBar {
                bar: PriceBar::new(day(1), 40.0, 44.0, 10.0, 10.0),
                ..eb(1, 0.0, 0.0, Allocation::Bull)
            },
            eb(2, 55.0, 9.0, Allocation::Bull),
        ];
        let report = engine().run(&bars);

        // Day 0 still in cash, buys at day 1 open of 40: 250 shares
        assert_eq!(report.stats.equity_curve[0].equity, dec!(10000));
        assert_eq!(report.stats.trades.len(), 1);
        let buy = &report.stats.trades[0];
        assert_eq!(buy.date, day(1));
        assert_eq!(buy.symbol, "TQQQ");
        assert_eq!(buy.quantity, dec!(250));
        // Marked at day 1 close 44 and day 2 close 55
        assert_eq!(report.stats.equity_curve[1].equity, dec!(11000));
        assert_eq!(report.stats.final_equity, dec!(13750));
        assert_eq!(report.final_allocation, Allocation::Bull);
    }

    #[test]
    fn test_switch_liquidates_then_buys() {
        let bars = vec![
            eb(0, 50.0, 10.0, Allocation::Bull),
            eb(1, 50.0, 10.0, Allocation::Bull),
            eb(2, 60.0, 8.0, Allocation::Bear),
            eb(3, 40.0, 12.5, Allocation::Bear),
        ];
        let report = engine().run(&bars);
        let trades = &report.stats.trades;

        assert_eq!(trades.len(), 3);
        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].symbol, "TQQQ");
        assert_eq!(trades[1].price, dec!(40));
        // 200 shares bought at 50, sold at 40
        assert_eq!(trades[1].pnl, Some(dec!(-2000)));
        assert_eq!(trades[2].side, Side::Buy);
        assert_eq!(trades[2].symbol, "SQQQ");
        assert_eq!(trades[2].quantity, dec!(640));
        assert_eq!(report.stats.final_equity, dec!(8000));
    }

    #[test]
    fn test_signal_on_last_bar_is_pending() {
        let bars = vec![
            eb(0, 50.0, 10.0, Allocation::Cash),
            eb(1, 50.0, 10.0, Allocation::Bear),
        ];
        let report = engine().run(&bars);

        assert_eq!(report.pending, Some(Allocation::Bear));
        assert_eq!(report.final_allocation, Allocation::Cash);
        assert_eq!(report.stats.total_trades, 0);
    }

    #[test]
    fn test_commission_charged_per_fill() {
        let config = BacktestConfig {
            commission_per_trade: dec!(1),
            ..BacktestConfig::default()
        };
        let bars = vec![
            eb(0, 50.0, 10.0, Allocation::Bull),
            eb(1, 50.0, 10.0, Allocation::Cash),
            eb(2, 50.0, 10.0, Allocation::Cash),
        ];
        let report = BacktestEngine::new(config).run(&bars);

        assert_eq!(report.stats.total_trades, 2);
        assert_eq!(report.stats.final_equity, dec!(9998));
        assert_eq!(report.stats.trades[1].pnl, Some(dec!(-2)));
    }

    #[test]
    fn test_empty_series() {
        let report = engine().run(&[]);
        assert_eq!(report.stats.final_equity, dec!(10000));
        assert!(report.start.is_none());
    }
}
