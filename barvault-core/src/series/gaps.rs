//! Trading-calendar gap detection.
//!
//! A trading day is any weekday. Exchange holidays are not modeled, so they show
//! up as one-day "minor gaps"; callers separate those from significant gaps with
//! [`split_significant`].

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Gaps longer than this many trading days are significant by default.
pub const DEFAULT_SIGNIFICANT_GAP_DAYS: u32 = 10;

/// A contiguous span of trading days missing from a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// First missing trading day.
    pub start: NaiveDate,
    /// Last missing trading day.
    pub end: NaiveDate,
    /// Number of missing trading days in `start..=end`.
    pub days: u32,
}

impl Gap {
    /// `days > threshold`.
    pub fn is_significant(&self, threshold: u32) -> bool {
        self.days > threshold
    }
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of weekdays in `start..=end`. Zero when `start > end`.
pub fn weekdays_in_range(start: NaiveDate, end: NaiveDate) -> u32 {
    if start > end {
        return 0;
    }
    let total = (end - start).num_days() + 1;
    let full_weeks = total / 7;
    let mut count = full_weeks * 5;
    let mut day = start + Duration::days(full_weeks * 7);
    while day <= end {
        if is_trading_day(day) {
            count += 1;
        }
        day += Duration::days(1);
    }
    count as u32
}

/// Number of weekdays strictly between `a` and `b`.
pub fn weekdays_between(a: NaiveDate, b: NaiveDate) -> u32 {
    if b <= a {
        return 0;
    }
    weekdays_in_range(a + Duration::days(1), b - Duration::days(1))
}

fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let mut d = date + Duration::days(1);
    while !is_trading_day(d) {
        d += Duration::days(1);
    }
    d
}

fn prev_trading_day(date: NaiveDate) -> NaiveDate {
    let mut d = date - Duration::days(1);
    while !is_trading_day(d) {
        d -= Duration::days(1);
    }
    d
}

/// Find every span of missing weekdays between consecutive dates.
///
/// `dates` must be ascending and unique. Fewer than two dates yields no gaps.
pub fn find_gaps(dates: &[NaiveDate]) -> Vec<Gap> {
    dates
        .windows(2)
        .filter_map(|pair| {
            let (earlier, later) = (pair[0], pair[1]);
            let days = weekdays_between(earlier, later);
            (days > 0).then(|| Gap {
                start: next_trading_day(earlier),
                end: prev_trading_day(later),
                days,
            })
        })
        .collect()
}

/// Partition gaps into `(significant, minor)` by `days > threshold`.
pub fn split_significant(gaps: &[Gap], threshold: u32) -> (Vec<Gap>, Vec<Gap>) {
    gaps.iter().partition(|g| g.is_significant(threshold))
}
