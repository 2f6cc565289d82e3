//! Requested date window for a fetch or a stored-series read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date range; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let r = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 2),
            NaiveDate::from_ymd_opt(2024, 1, 4),
        );
        assert!(r.contains(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert!(r.contains(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()));
        assert!(!r.contains(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
        assert!(DateRange::unbounded().contains(NaiveDate::MIN));
    }
}
