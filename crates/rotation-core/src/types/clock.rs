//! Market clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Exchange session state as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketClock {
    /// Broker's current time
    pub timestamp: DateTime<Utc>,
    /// Whether the regular session is open
    pub is_open: bool,
    /// Start of the next session
    pub next_open: DateTime<Utc>,
    /// End of the current or next session
    pub next_close: DateTime<Utc>,
}

impl MarketClock {
    /// Minutes from `timestamp` until `next_close`.
    pub fn minutes_to_close(&self) -> f64 {
        (self.next_close - self.timestamp).num_seconds() as f64 / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_minutes_to_close() {
        let clock = MarketClock {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 19, 48, 30).unwrap(),
            is_open: true,
            next_open: Utc.with_ymd_and_hms(2024, 5, 2, 13, 30, 0).unwrap(),
            next_close: Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap(),
        };
        assert!((clock.minutes_to_close() - 11.5).abs() < 1e-9);
    }
}
