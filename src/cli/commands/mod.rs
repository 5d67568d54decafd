//! CLI command implementations.

pub mod backtest;
pub mod live;
pub mod signals;
pub mod validate;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rotation_broker::{AlpacaBroker, AlpacaConfig};
use rotation_config::AppConfig;
use rotation_core::traits::MarketData;
use rotation_core::types::PriceBar;
use rotation_data::{fetch_pair, CsvDataSource};
use rotation_strategy::SignalConfig;
use std::path::Path;
use tracing::info;

/// Build the Alpaca client from the credential variables the config names.
pub fn alpaca(config: &AppConfig) -> Result<AlpacaBroker> {
    let settings = &config.alpaca;
    let alpaca_config = AlpacaConfig::from_env(
        &settings.api_key_env,
        &settings.api_secret_env,
        &settings.base_url_env,
        &settings.base_url,
    )
    .context("Alpaca credentials")?
    .with_data_url(&settings.data_url)
    .with_feed(&settings.feed);

    info!(base_url = %alpaca_config.base_url, feed = %alpaca_config.feed, "Using Alpaca");
    Ok(AlpacaBroker::new(alpaca_config)?)
}

/// CSV directory when given, Alpaca otherwise.
pub fn market_data(data: Option<&Path>, config: &AppConfig) -> Result<Box<dyn MarketData>> {
    match data {
        Some(dir) => {
            let source = CsvDataSource::new(dir).with_context(|| {
                format!(
                    "Data path '{}' must be a directory of CSV files (e.g. --data ./data)",
                    dir.display()
                )
            })?;
            Ok(Box::new(source))
        }
        None => Ok(Box::new(alpaca(config)?)),
    }
}

pub fn signal_config(config: &AppConfig) -> SignalConfig {
    SignalConfig {
        fast: config.strategy.fast,
        medium: config.strategy.medium,
        slow: config.strategy.slow,
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Fetch the aligned pair from `start` (less a warm-up margin so the first
/// requested day already has a full slow window) through `end`.
pub async fn load_pair(
    source: &dyn MarketData,
    config: &AppConfig,
    start: NaiveDate,
    end: DateTime<Utc>,
) -> Result<Vec<PriceBar>> {
    // Two calendar days per trading day covers weekends and holidays.
    let warmup = Duration::days(config.strategy.slow as i64 * 2 + 10);
    let bars = fetch_pair(source, &config.instruments.pair(), start_of_day(start) - warmup, end)
        .await
        .context("Failed to load market data")?;
    info!(bars = bars.len(), "Loaded aligned bars");
    Ok(bars)
}
