//! TickerSummary — the materialized projection of a stored series.

use super::bar::Bar;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Summary of one ticker's stored series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub symbol: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_update: NaiveDateTime,
    pub source: String,
    pub record_count: usize,
}

impl TickerSummary {
    /// Project a summary out of an ascending series. `None` for an empty series.
    ///
    /// The source tag is taken from the most recent bar.
    pub fn from_series(symbol: &str, bars: &[Bar], last_update: NaiveDateTime) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;
        Some(Self {
            symbol: symbol.to_string(),
            first_date: first.date,
            last_date: last.date,
            last_update,
            source: last.source.clone(),
            record_count: bars.len(),
        })
    }
}
