//! Backtest report generation.

use chrono::NaiveDate;
use rotation_core::types::Allocation;
use serde::{Deserialize, Serialize};

use crate::{BacktestConfig, BacktestStats};

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Configuration used
    pub config: BacktestConfig,
    /// First evaluated date
    pub start: Option<NaiveDate>,
    /// Last evaluated date
    pub end: Option<NaiveDate>,
    /// Allocation held after the last bar
    pub final_allocation: Allocation,
    /// Transition signalled on the last bar, not yet executed
    pub pending: Option<Allocation>,
    /// Statistics
    pub stats: BacktestStats,
}

#[derive(Serialize)]
struct TradeRow<'a> {
    date: NaiveDate,
    symbol: &'a str,
    side: &'a str,
    quantity: String,
    price: String,
    value: String,
    commission: String,
    pnl: String,
    reason: &'a str,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!(
            "  Instruments:         {} / {}\n",
            self.config.instruments.bull, self.config.instruments.bear
        ));
        s.push_str(&format!(
            "  Period:              {} → {}\n",
            date(self.start),
            date(self.end)
        ));
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Initial Capital:     ${:.2}\n",
            self.stats.initial_capital
        ));
        s.push_str(&format!(
            "  Final Equity:        ${:.2}\n",
            self.stats.final_equity
        ));
        s.push_str(&format!(
            "  Total Return:        {:.2}%\n",
            self.stats.total_return_pct
        ));
        s.push_str(&format!(
            "  Annualized Return:   {:.2}%\n",
            self.stats.annualized_return_pct
        ));
        s.push_str(&format!(
            "  Max Drawdown:        {:.2}%\n",
            self.stats.max_drawdown_pct
        ));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Sharpe Ratio:        {:.2}\n",
            self.stats.sharpe_ratio
        ));
        s.push_str(&format!(
            "  Sortino Ratio:       {:.2}\n",
            self.stats.sortino_ratio
        ));
        s.push_str(&format!(
            "  Profit Factor:       {:.2}\n",
            self.stats.profit_factor
        ));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Total Fills:         {}\n",
            self.stats.total_trades
        ));
        s.push_str(&format!(
            "  Round Trips:         {}\n",
            self.stats.round_trips
        ));
        s.push_str(&format!(
            "  Winning Trades:      {}\n",
            self.stats.winning_trades
        ));
        s.push_str(&format!(
            "  Losing Trades:       {}\n",
            self.stats.losing_trades
        ));
        s.push_str(&format!(
            "  Win Rate:            {:.2}%\n",
            self.stats.win_rate_pct
        ));
        s.push_str(&format!(
            "  Avg Win:             ${:.2}\n",
            self.stats.avg_win
        ));
        s.push_str(&format!(
            "  Avg Loss:            ${:.2}\n",
            self.stats.avg_loss
        ));
        s.push('\n');

        s.push_str("EXPOSURE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        let [bull, bear, cash] = self.stats.days_in_market;
        s.push_str(&format!(
            "  Days {:<15} {}\n",
            format!("{}:", self.config.instruments.bull),
            bull
        ));
        s.push_str(&format!(
            "  Days {:<15} {}\n",
            format!("{}:", self.config.instruments.bear),
            bear
        ));
        s.push_str(&format!("  Days in Cash:        {}\n", cash));
        s.push_str(&format!(
            "  Final Allocation:    {}\n",
            self.final_allocation
        ));
        if let Some(pending) = self.pending {
            s.push_str(&format!(
                "  Pending:             {} (next open)\n",
                pending
            ));
        }
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the equity curve to CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("date,allocation,equity\n");
        for point in &self.stats.equity_curve {
            csv.push_str(&format!(
                "{},{},{:.2}\n",
                point.date, point.allocation, point.equity
            ));
        }
        csv
    }

    /// Export the trade log to CSV.
    pub fn trades_to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        for trade in &self.stats.trades {
            writer.serialize(TradeRow {
                date: trade.date,
                symbol: &trade.symbol,
                side: trade.side.as_str(),
                quantity: trade.quantity.round_dp(4).normalize().to_string(),
                price: format!("{:.2}", trade.price),
                value: format!("{:.2}", trade.value),
                commission: format!("{:.2}", trade.commission),
                pnl: trade.pnl.map(|p| format!("{:.2}", p)).unwrap_or_default(),
                reason: trade.reason.as_deref().unwrap_or(""),
            })?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}
