//! Daily price bars.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single instrument.
/// Uses f64 for fast indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Calendar date (UTC) the bar belongs to.
    pub fn date(&self) -> NaiveDate {
        self.datetime().date_naive()
    }
}

/// One trading day of the bull/bear pair.
///
/// Only the bull close drives the signal; opens are used by the simulator
/// for next-day execution and the bear close for sizing bear purchases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub bull_open: f64,
    pub bull_close: f64,
    pub bear_open: f64,
    pub bear_close: f64,
}

impl PriceBar {
    pub fn new(
        date: NaiveDate,
        bull_open: f64,
        bull_close: f64,
        bear_open: f64,
        bear_close: f64,
    ) -> Self {
        Self {
            date,
            bull_open,
            bull_close,
            bear_open,
            bear_close,
        }
    }

    /// Join a bull and a bear bar from the same session.
    pub fn from_pair(bull: &Bar, bear: &Bar) -> Self {
        Self::new(bull.date(), bull.open, bull.close, bear.open, bear.close)
    }

    /// The four prices in column order, labelled.
    pub fn prices(&self) -> [(&'static str, f64); 4] {
        [
            ("bull_open", self.bull_open),
            ("bull_close", self.bull_close),
            ("bear_open", self.bear_open),
            ("bear_close", self.bear_close),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_date_is_utc_calendar_day() {
        // 2024-01-15T14:30:00Z
        let bar = Bar::new(1_705_329_000_000, 50.0, 51.0, 49.5, 50.5, 1_000_000.0);
        assert_eq!(bar.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_price_bar_from_pair() {
        let bull = Bar::new(1_705_276_800_000, 50.0, 51.0, 49.0, 50.5, 1.0);
        let bear = Bar::new(1_705_276_800_000, 12.0, 12.4, 11.8, 11.9, 1.0);
        let bar = PriceBar::from_pair(&bull, &bear);

        assert_eq!(bar.bull_open, 50.0);
        assert_eq!(bar.bull_close, 50.5);
        assert_eq!(bar.bear_open, 12.0);
        assert_eq!(bar.bear_close, 11.9);
        assert_eq!(bar.date, bull.date());
    }
}
