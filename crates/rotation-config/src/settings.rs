//! Configuration structures.

use chrono::NaiveDate;
use rotation_core::types::{InstrumentPair, TimeInForce};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub alpaca: AlpacaSettings,
    #[serde(default)]
    pub instruments: InstrumentSettings,
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Check cross-field constraints that deserialisation cannot.
    pub fn validate(&self) -> Result<(), String> {
        let s = &self.strategy;
        if !(s.fast > 0 && s.fast < s.medium && s.medium < s.slow) {
            return Err(format!(
                "strategy windows must satisfy 0 < fast < medium < slow, got {}/{}/{}",
                s.fast, s.medium, s.slow
            ));
        }

        let i = &self.instruments;
        if i.bull.trim().is_empty() || i.bear.trim().is_empty() {
            return Err("instruments.bull and instruments.bear must be set".into());
        }
        if i.bull.eq_ignore_ascii_case(&i.bear) {
            return Err(format!("bull and bear instruments are both {}", i.bull));
        }

        if self.trading.capital <= Decimal::ZERO {
            return Err(format!("trading.capital must be positive, got {}", self.trading.capital));
        }
        if self.trading.entry_window_minutes <= 0 {
            return Err("trading.entry_window_minutes must be positive".into());
        }
        if self.backtest.initial_capital <= Decimal::ZERO {
            return Err("backtest.initial_capital must be positive".into());
        }
        if self.backtest.commission_per_trade < Decimal::ZERO {
            return Err("backtest.commission_per_trade cannot be negative".into());
        }
        if let (Some(start), Some(end)) = (self.backtest.start, self.backtest.end) {
            if start >= end {
                return Err(format!("backtest.start {} is not before end {}", start, end));
            }
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => return Err(format!("logging.format must be pretty or json, got {}", other)),
        }

        Ok(())
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "rotation".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Directory for a daily rolling log file
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Alpaca API settings. Credentials are never stored here, only the names
/// of the environment variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlpacaSettings {
    pub api_key_env: String,
    pub api_secret_env: String,
    pub base_url_env: String,
    /// Trading API used when the base URL variable is unset
    pub base_url: String,
    pub data_url: String,
    pub feed: String,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            api_key_env: "ALPACA_API_KEY".to_string(),
            api_secret_env: "ALPACA_SECRET_KEY".to_string(),
            base_url_env: "ALPACA_BASE_URL".to_string(),
            base_url: "https://paper-api.alpaca.markets".to_string(),
            data_url: "https://data.alpaca.markets".to_string(),
            feed: "iex".to_string(),
        }
    }
}

/// The traded pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSettings {
    pub bull: String,
    pub bear: String,
}

impl InstrumentSettings {
    pub fn pair(&self) -> InstrumentPair {
        InstrumentPair::new(self.bull.to_uppercase(), self.bear.to_uppercase())
    }
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        let pair = InstrumentPair::default();
        Self {
            bull: pair.bull,
            bear: pair.bear,
        }
    }
}

/// Moving-average windows, in bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub fast: usize,
    pub medium: usize,
    pub slow: usize,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            fast: 9,
            medium: 14,
            slow: 19,
        }
    }
}

/// Live session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    /// First day of history fetched for the averages
    pub history_start: NaiveDate,
    /// Capital deployed per purchase
    pub capital: Decimal,
    /// Size purchases from account buying power instead of `capital`
    pub use_buying_power: bool,
    /// Act only within this many minutes of the close
    pub entry_window_minutes: i64,
    pub fractional_shares: bool,
    pub time_in_force: TimeInForce,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            history_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            capital: dec!(10000),
            use_buying_power: false,
            entry_window_minutes: 15,
            fractional_shares: false,
            time_in_force: TimeInForce::Day,
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    pub commission_per_trade: Decimal,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            commission_per_trade: Decimal::ZERO,
            start: None,
            end: None,
        }
    }
}
