//! Market clock gate.

use rotation_core::types::MarketClock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session did not trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Regular session is closed
    MarketClosed,
    /// Open, but more than the entry window away from the close
    TooEarly { minutes_to_close: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MarketClosed => write!(f, "market closed"),
            SkipReason::TooEarly { minutes_to_close } => {
                write!(f, "too early, {:.1} minutes to close", minutes_to_close)
            }
        }
    }
}

/// Lets a session through only in the last minutes of the regular session,
/// when the daily close is effectively known.
#[derive(Debug, Clone, Copy)]
pub struct ClockGate {
    entry_window_minutes: i64,
}

impl ClockGate {
    pub fn new(entry_window_minutes: i64) -> Self {
        Self {
            entry_window_minutes,
        }
    }

    pub fn check(&self, clock: &MarketClock) -> Result<(), SkipReason> {
        if !clock.is_open {
            return Err(SkipReason::MarketClosed);
        }
        let minutes_to_close = clock.minutes_to_close();
        if minutes_to_close > self.entry_window_minutes as f64 {
            return Err(SkipReason::TooEarly { minutes_to_close });
        }
        Ok(())
    }
}

impl Default for ClockGate {
    fn default() -> Self {
        Self::new(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn clock(is_open: bool, minutes_to_close: i64) -> MarketClock {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 19, 0, 0).unwrap();
        MarketClock {
            timestamp: now,
            is_open,
            next_open: now + Duration::hours(18),
            next_close: now + Duration::minutes(minutes_to_close),
        }
    }

    #[test]
    fn test_closed_market_skips() {
        assert_eq!(
            ClockGate::default().check(&clock(false, 5)),
            Err(SkipReason::MarketClosed)
        );
    }

    #[test]
    fn test_too_early_skips() {
        let result = ClockGate::default().check(&clock(true, 60));
        assert!(matches!(
            result,
            Err(SkipReason::TooEarly { minutes_to_close }) if minutes_to_close == 60.0
        ));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        assert!(ClockGate::default().check(&clock(true, 15)).is_ok());
        assert!(ClockGate::default().check(&clock(true, 3)).is_ok());
        assert!(ClockGate::new(30).check(&clock(true, 25)).is_ok());
    }
}
