//! The traded instrument pair.

use serde::{Deserialize, Serialize};

use super::{Allocation, PriceBar};

/// Bull and bear symbols the rotation moves between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentPair {
    pub bull: String,
    pub bear: String,
}

impl InstrumentPair {
    pub fn new(bull: impl Into<String>, bear: impl Into<String>) -> Self {
        Self {
            bull: bull.into(),
            bear: bear.into(),
        }
    }

    /// Symbol held for an allocation, `None` for cash.
    pub fn symbol_for(&self, allocation: Allocation) -> Option<&str> {
        match allocation {
            Allocation::Bull => Some(&self.bull),
            Allocation::Bear => Some(&self.bear),
            Allocation::Cash => None,
        }
    }

    /// Allocation a held symbol corresponds to, if it is one of the pair.
    pub fn allocation_of(&self, symbol: &str) -> Option<Allocation> {
        if symbol.eq_ignore_ascii_case(&self.bull) {
            Some(Allocation::Bull)
        } else if symbol.eq_ignore_ascii_case(&self.bear) {
            Some(Allocation::Bear)
        } else {
            None
        }
    }

    /// Closing price of the instrument behind an allocation.
    pub fn close_for(&self, allocation: Allocation, bar: &PriceBar) -> Option<f64> {
        match allocation {
            Allocation::Bull => Some(bar.bull_close),
            Allocation::Bear => Some(bar.bear_close),
            Allocation::Cash => None,
        }
    }

    /// Opening price of the instrument behind an allocation.
    pub fn open_for(&self, allocation: Allocation, bar: &PriceBar) -> Option<f64> {
        match allocation {
            Allocation::Bull => Some(bar.bull_open),
            Allocation::Bear => Some(bar.bear_open),
            Allocation::Cash => None,
        }
    }
}

impl Default for InstrumentPair {
    fn default() -> Self {
        Self::new("TQQQ", "SQQQ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_symbol_mapping() {
        let pair = InstrumentPair::default();
        assert_eq!(pair.symbol_for(Allocation::Bull), Some("TQQQ"));
        assert_eq!(pair.symbol_for(Allocation::Bear), Some("SQQQ"));
        assert_eq!(pair.symbol_for(Allocation::Cash), None);

        assert_eq!(pair.allocation_of("sqqq"), Some(Allocation::Bear));
        assert_eq!(pair.allocation_of("SPY"), None);
    }

    #[test]
    fn test_prices_per_allocation() {
        let pair = InstrumentPair::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bar = PriceBar::new(date, 60.0, 61.0, 11.0, 10.5);

        assert_eq!(pair.close_for(Allocation::Bear, &bar), Some(10.5));
        assert_eq!(pair.open_for(Allocation::Bull, &bar), Some(60.0));
        assert_eq!(pair.open_for(Allocation::Cash, &bar), None);
    }
}
