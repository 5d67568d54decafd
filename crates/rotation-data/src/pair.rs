//! Bull/bear pair alignment.

use chrono::{DateTime, NaiveDate, Utc};
use rotation_core::error::DataError;
use rotation_core::traits::MarketData;
use rotation_core::types::{Bar, InstrumentPair, PriceBar};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Join bull and bear bars on calendar date.
///
/// Days present on only one side are dropped. If a side repeats a date the
/// later bar wins. The result is in date order.
pub fn align_pair(bull: &[Bar], bear: &[Bar]) -> Vec<PriceBar> {
    let by_date = |bars: &[Bar]| -> BTreeMap<NaiveDate, Bar> {
        bars.iter().map(|b| (b.date(), *b)).collect()
    };
    let bull = by_date(bull);
    let bear = by_date(bear);

    let aligned: Vec<PriceBar> = bull
        .iter()
        .filter_map(|(date, bull_bar)| {
            bear.get(date).map(|bear_bar| PriceBar::from_pair(bull_bar, bear_bar))
        })
        .collect();

    let dropped = bull.len().max(bear.len()) - aligned.len();
    if dropped > 0 {
        debug!(dropped, "Dropped days missing from one side of the pair");
    }

    aligned
}

/// Fetch both instruments and align them.
pub async fn fetch_pair(
    source: &dyn MarketData,
    instruments: &InstrumentPair,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PriceBar>, DataError> {
    info!(
        bull = %instruments.bull,
        bear = %instruments.bear,
        source = source.name(),
        %start,
        %end,
        "Fetching daily bars"
    );

    let bull = source.daily_bars(&instruments.bull, start, end).await?;
    let bear = source.daily_bars(&instruments.bear, start, end).await?;

    let aligned = align_pair(&bull, &bear);
    if aligned.is_empty() {
        return Err(DataError::NoDataAvailable);
    }

    debug!(
        bull_bars = bull.len(),
        bear_bars = bear.len(),
        aligned = aligned.len(),
        "Aligned pair"
    );
    Ok(aligned)
}
