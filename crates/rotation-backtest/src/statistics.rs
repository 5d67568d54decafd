//! Backtest statistics.

use chrono::NaiveDate;
use rotation_core::types::{Allocation, Side};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Trading days per year used for annualisation.
const TRADING_DAYS: f64 = 252.0;

/// Record of a single simulated fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Notional value of the fill, before commission
    pub value: Decimal,
    pub commission: Decimal,
    /// Reason of the signal that caused the trade
    pub reason: Option<String>,
    /// Round-trip P&L, set on the sell that closes a position
    pub pnl: Option<Decimal>,
}

/// One point of the equity curve, marked at the close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub allocation: Allocation,
    pub equity: Decimal,
}

/// Backtest statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Final equity
    pub final_equity: Decimal,
    /// Total return percentage
    pub total_return_pct: Decimal,
    /// Annualized return percentage
    pub annualized_return_pct: Decimal,
    /// Maximum drawdown percentage
    pub max_drawdown_pct: Decimal,
    /// Sharpe ratio (assuming risk-free rate of 0)
    pub sharpe_ratio: f64,
    /// Sortino ratio
    pub sortino_ratio: f64,
    /// Total number of fills
    pub total_trades: usize,
    /// Closed round trips
    pub round_trips: usize,
    /// Number of winning round trips
    pub winning_trades: usize,
    /// Number of losing round trips
    pub losing_trades: usize,
    /// Win rate percentage over round trips
    pub win_rate_pct: Decimal,
    /// Average profit per winning round trip
    pub avg_win: Decimal,
    /// Average loss per losing round trip
    pub avg_loss: Decimal,
    /// Profit factor (gross profit / gross loss)
    pub profit_factor: Decimal,
    /// Number of bars processed
    pub bars_processed: usize,
    /// Days spent in each allocation: bull, bear, cash
    pub days_in_market: [usize; 3],
    /// Equity curve
    pub equity_curve: Vec<EquityPoint>,
    /// All trades
    pub trades: Vec<TradeRecord>,
    /// Peak equity (for drawdown)
    #[serde(skip)]
    peak_equity: Decimal,
    /// Daily returns for Sharpe calculation
    #[serde(skip)]
    daily_returns: Vec<f64>,
}

impl BacktestStats {
    /// Create new stats tracker.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            total_return_pct: Decimal::ZERO,
            annualized_return_pct: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            total_trades: 0,
            round_trips: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            bars_processed: 0,
            days_in_market: [0; 3],
            equity_curve: Vec::new(),
            trades: Vec::new(),
            peak_equity: initial_capital,
            daily_returns: Vec::new(),
        }
    }

    /// Record equity at a close.
    pub fn record_equity(&mut self, date: NaiveDate, allocation: Allocation, equity: Decimal) {
        let prev_equity = self
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital);
        if prev_equity > Decimal::ZERO {
            let ret = ((equity - prev_equity) / prev_equity).to_f64().unwrap_or(0.0);
            self.daily_returns.push(ret);
        }

        self.equity_curve.push(EquityPoint {
            date,
            allocation,
            equity,
        });

        // Update peak and drawdown
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }

        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * dec!(100);
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }

        let slot = match allocation {
            Allocation::Bull => 0,
            Allocation::Bear => 1,
            Allocation::Cash => 2,
        };
        self.days_in_market[slot] += 1;
        self.bars_processed += 1;
    }

    /// Add a trade record.
    pub fn add_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
        self.total_trades += 1;
    }

    /// Calculate final statistics.
    pub fn finalize(&mut self, final_equity: Decimal) {
        self.final_equity = final_equity;

        // Total return
        if self.initial_capital > Decimal::ZERO {
            self.total_return_pct =
                (self.final_equity - self.initial_capital) / self.initial_capital * dec!(100);
        }

        // Annualized return (daily bars)
        if !self.equity_curve.is_empty() {
            let days = self.equity_curve.len() as f64;
            let total_return = self.total_return_pct.to_f64().unwrap_or(0.0) / 100.0;
            let annualized = ((1.0 + total_return).powf(TRADING_DAYS / days) - 1.0) * 100.0;
            self.annualized_return_pct = Decimal::try_from(annualized).unwrap_or(Decimal::ZERO);
        }

        // Calculate trade statistics
        let mut total_profit = Decimal::ZERO;
        let mut total_loss = Decimal::ZERO;

        for pnl in self.trades.iter().filter_map(|t| t.pnl) {
            self.round_trips += 1;
            if pnl > Decimal::ZERO {
                self.winning_trades += 1;
                total_profit += pnl;
            } else if pnl < Decimal::ZERO {
                self.losing_trades += 1;
                total_loss += pnl.abs();
            }
        }

        if self.round_trips > 0 {
            self.win_rate_pct =
                Decimal::from(self.winning_trades * 100) / Decimal::from(self.round_trips);
        }

        // Average win/loss
        if self.winning_trades > 0 {
            self.avg_win = total_profit / Decimal::from(self.winning_trades);
        }
        if self.losing_trades > 0 {
            self.avg_loss = total_loss / Decimal::from(self.losing_trades);
        }

        // Profit factor
        if total_loss > Decimal::ZERO {
            self.profit_factor = total_profit / total_loss;
        }

        // Sharpe ratio
        if !self.daily_returns.is_empty() {
            let n = self.daily_returns.len() as f64;
            let mean: f64 = self.daily_returns.iter().sum::<f64>() / n;
            let variance: f64 = self
                .daily_returns
                .iter()
                .map(|r| (r - mean).powi(2))
                .sum::<f64>()
                / n;
            let std_dev = variance.sqrt();

            if std_dev > 0.0 {
                self.sharpe_ratio = (mean * TRADING_DAYS.sqrt()) / std_dev;
            }

            // Sortino ratio (only downside deviation)
            let negative_returns: Vec<f64> = self
                .daily_returns
                .iter()
                .filter(|&&r| r < 0.0)
                .copied()
                .collect();

            if !negative_returns.is_empty() {
                let downside_variance: f64 = negative_returns.iter().map(|r| r.powi(2)).sum::<f64>()
                    / negative_returns.len() as f64;
                let downside_dev = downside_variance.sqrt();

                if downside_dev > 0.0 {
                    self.sortino_ratio = (mean * TRADING_DAYS.sqrt()) / downside_dev;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sell(pnl: Decimal) -> TradeRecord {
        TradeRecord {
            date: d(2),
            symbol: "TQQQ".into(),
            side: Side::Sell,
            quantity: dec!(1),
            price: dec!(1),
            value: dec!(1),
            commission: Decimal::ZERO,
            reason: None,
            pnl: Some(pnl),
        }
    }

    #[test]
    fn test_drawdown_tracks_peak() {
        let mut stats = BacktestStats::new(dec!(100));
        stats.record_equity(d(1), Allocation::Bull, dec!(120));
        stats.record_equity(d(2), Allocation::Bull, dec!(90));
        stats.record_equity(d(3), Allocation::Bull, dec!(130));
        stats.finalize(dec!(130));

        assert_eq!(stats.max_drawdown_pct, dec!(25));
        assert_eq!(stats.total_return_pct, dec!(30));
        assert_eq!(stats.days_in_market, [3, 0, 0]);
    }

    #[test]
    fn test_round_trip_statistics() {
        let mut stats = BacktestStats::new(dec!(1000));
        stats.add_trade(sell(dec!(100)));
        stats.add_trade(sell(dec!(-50)));
        stats.add_trade(sell(dec!(200)));
        stats.finalize(dec!(1250));

        assert_eq!(stats.round_trips, 3);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.avg_win, dec!(150));
        assert_eq!(stats.avg_loss, dec!(50));
        assert_eq!(stats.profit_factor, dec!(6));
    }

    #[test]
    fn test_flat_equity_has_zero_ratios() {
        let mut stats = BacktestStats::new(dec!(100));
        for day in 1..=5 {
            stats.record_equity(d(day), Allocation::Cash, dec!(100));
        }
        stats.finalize(dec!(100));

        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.sortino_ratio, 0.0);
        assert_eq!(stats.annualized_return_pct, Decimal::ZERO);
    }

    #[test]
    fn test_rising_equity_has_positive_sharpe() {
        let mut stats = BacktestStats::new(dec!(100));
        let curve = [dec!(101), dec!(103), dec!(102), dec!(105)];
        for (i, equity) in curve.into_iter().enumerate() {
            stats.record_equity(d(i as u32 + 1), Allocation::Bull, equity);
        }
        stats.finalize(dec!(105));

        assert!(stats.sharpe_ratio > 0.0);
        assert!(stats.sortino_ratio > 0.0);
    }
}
