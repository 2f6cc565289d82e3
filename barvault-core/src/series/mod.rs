//! Pure operations over one ticker's series: gap detection and merging.

pub mod gaps;
pub mod merge;

pub use gaps::{
    find_gaps, is_trading_day, split_significant, weekdays_between, weekdays_in_range, Gap,
    DEFAULT_SIGNIFICANT_GAP_DAYS,
};
pub use merge::{canonicalize, merge, merge_with_stats, MergeStats};

use crate::domain::Bar;
use chrono::NaiveDate;

/// Dates of a series, in order.
pub fn dates(bars: &[Bar]) -> Vec<NaiveDate> {
    bars.iter().map(|b| b.date).collect()
}

/// Gaps in a series of bars.
pub fn series_gaps(bars: &[Bar]) -> Vec<Gap> {
    find_gaps(&dates(bars))
}
