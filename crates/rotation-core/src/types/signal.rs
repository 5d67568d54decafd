//! Allocation signals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the account should hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Allocation {
    /// Long the bull instrument
    Bull,
    /// Long the bear (inverse) instrument
    Bear,
    /// Flat
    #[default]
    Cash,
}

impl Allocation {
    /// Whether this allocation holds an instrument.
    pub fn is_invested(&self) -> bool {
        !matches!(self, Allocation::Cash)
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allocation::Bull => write!(f, "BULL"),
            Allocation::Bear => write!(f, "BEAR"),
            Allocation::Cash => write!(f, "CASH"),
        }
    }
}

/// Target allocation for one bar and why it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub allocation: Allocation,
    /// `None` only when no rule matched and the bar defaulted to cash.
    pub reason: Option<String>,
}

impl Signal {
    pub fn new(allocation: Allocation, reason: impl Into<String>) -> Self {
        Self {
            allocation,
            reason: Some(reason.into()),
        }
    }

    /// Cash with no rule attached.
    pub fn fallthrough() -> Self {
        Self {
            allocation: Allocation::Cash,
            reason: None,
        }
    }

    pub fn reason_or_empty(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

/// Trailing simple averages of the bull close for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub fast: f64,
    pub medium: f64,
    pub slow: f64,
}

impl MovingAverages {
    pub fn new(fast: f64, medium: f64, slow: f64) -> Self {
        Self { fast, medium, slow }
    }

    /// Fast average strictly above the medium one.
    #[inline]
    pub fn fast_above_medium(&self) -> bool {
        self.fast > self.medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_display() {
        assert_eq!(Allocation::Bull.to_string(), "BULL");
        assert_eq!(Allocation::Bear.to_string(), "BEAR");
        assert_eq!(Allocation::Cash.to_string(), "CASH");
        assert!(!Allocation::Cash.is_invested());
    }

    #[test]
    fn test_allocation_serde_uppercase() {
        let json = serde_json::to_string(&Allocation::Bear).unwrap();
        assert_eq!(json, "\"BEAR\"");
    }

    #[test]
    fn test_fallthrough_signal() {
        let signal = Signal::fallthrough();
        assert_eq!(signal.allocation, Allocation::Cash);
        assert!(signal.reason.is_none());
        assert_eq!(signal.reason_or_empty(), "");
    }
}
