//! Bar — one trading day of price and volume data for one ticker.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar with raw and adjusted prices.
///
/// Raw prices are as traded. Adjusted prices are retroactively corrected by the
/// upstream source for splits and dividends, which is why a later fetch of the
/// same date may carry different adjusted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_open: f64,
    pub adj_high: f64,
    pub adj_low: f64,
    pub adj_close: f64,
    pub adj_volume: u64,
    /// Close-to-close percent change of the adjusted close. Absent on the first bar.
    pub pct_change: Option<f64>,
    /// True if a split took effect on this date.
    pub split: bool,
    /// Short tag naming the data source (e.g. `tiingo`).
    pub source: String,
    pub fetched_at: NaiveDateTime,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.adj_open,
            self.adj_high,
            self.adj_low,
            self.adj_close,
        ]
        .iter()
        .any(|p| p.is_nan())
    }

    /// Prices are non-negative and high/low bracket open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.open >= 0.0
            && self.close >= 0.0
            && self.low >= 0.0
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Returns true if `bars` is strictly ascending by date (which implies unique dates).
pub fn is_strictly_ascending(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}


#[cfg(test)]
mod tests {
    use super::fixtures::bar;
    use super::*;

    #[test]
    fn bar_is_sane() {
        assert!(bar("2024-01-02", 100.0).is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut b = bar("2024-01-02", 100.0);
        b.adj_close = f64::NAN;
        assert!(b.is_void());
        assert!(!b.is_sane());
    }

    #[test]
    fn bar_detects_inverted_high_low() {
        let mut b = bar("2024-01-02", 100.0);
        b.high = 90.0;
        assert!(!b.is_sane());
    }

    #[test]
    fn ascending_check_rejects_duplicates() {
        let bars = vec![bar("2024-01-02", 1.0), bar("2024-01-02", 2.0)];
        assert!(!is_strictly_ascending(&bars));
        assert!(is_strictly_ascending(&bars[..1]));
    }
}
