//! Market data source trait.

use crate::error::DataError;
use crate::types::Bar;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for historical daily bar sources.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch daily bars.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to fetch
    /// * `start` - Start of the date range
    /// * `end` - End of the date range
    ///
    /// # Returns
    /// A vector of bars ordered from oldest to newest. Non-trading days are
    /// simply absent.
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}
