//! Update planner: decides what, if anything, to fetch for one symbol.
//!
//! The decision depends only on the stored series snapshot, the caller's
//! requested range and mode, and `today`. Nothing here touches the network
//! or the filesystem.

use crate::domain::{Bar, DateRange, SplitEvent};
use crate::series::{series_gaps, weekdays_in_range};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a fetch is being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchIntent {
    /// Nothing stored yet.
    Initial,
    /// Only dates after the last stored date.
    Tail,
    /// Full history again, so upstream back-fills can close gaps.
    Backfill,
    /// Data exists but the caller named explicit dates.
    Requested,
    /// Data exists and the caller forced a re-fetch.
    Forced,
}

impl fmt::Display for FetchIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Tail => "tail",
            Self::Backfill => "backfill",
            Self::Requested => "requested",
            Self::Forced => "forced",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    ExistsNotForced,
    AlreadyCurrent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExistsNotForced => f.write_str("exists, not forced"),
            Self::AlreadyCurrent => f.write_str("already current"),
        }
    }
}

/// Planner output. A skip always carries its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    Fetch { intent: FetchIntent, range: DateRange },
    Skip { reason: SkipReason },
}

impl FetchPlan {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanMode {
    /// Extend or repair an existing series.
    pub update: bool,
    /// Re-fetch even though data exists.
    pub force: bool,
}

/// Decide the fetch for `symbol`.
///
/// `existing` is the stored series (ascending), `None` or empty when nothing is stored.
/// Explicit bounds in `requested` override the derived tail/backfill bounds
/// component-wise. Gaps count toward a backfill only when their `days`
/// exceed `backfill_min_gap_days`. A tail whose merged bounds are reversed
/// (an explicit end before the day after the last stored bar) is already
/// covered and is skipped.
pub fn plan_fetch(
    symbol: &str,
    existing: Option<&[Bar]>,
    requested: DateRange,
    mode: PlanMode,
    today: NaiveDate,
    backfill_min_gap_days: u32,
) -> FetchPlan {
    let plan = decide(existing, requested, mode, today, backfill_min_gap_days);
    debug!(symbol, ?plan, "planned fetch");
    plan
}

fn decide(
    existing: Option<&[Bar]>,
    requested: DateRange,
    mode: PlanMode,
    today: NaiveDate,
    backfill_min_gap_days: u32,
) -> FetchPlan {
    let Some(last) = existing.and_then(|bars| bars.last()) else {
        return FetchPlan::Fetch {
            intent: FetchIntent::Initial,
            range: requested,
        };
    };
    let bars = existing.unwrap_or_default();

    if mode.force {
        return FetchPlan::Fetch {
            intent: FetchIntent::Forced,
            range: requested,
        };
    }

    if !mode.update {
        return if requested.is_unbounded() {
            FetchPlan::Skip {
                reason: SkipReason::ExistsNotForced,
            }
        } else {
            FetchPlan::Fetch {
                intent: FetchIntent::Requested,
                range: requested,
            }
        };
    }

    let has_gaps = series_gaps(bars)
        .iter()
        .any(|g| g.days > backfill_min_gap_days);
    if has_gaps {
        return FetchPlan::Fetch {
            intent: FetchIntent::Backfill,
            range: requested,
        };
    }

    let tail_start = last.date + Duration::days(1);
    if requested.is_unbounded() && weekdays_in_range(tail_start, today) == 0 {
        return FetchPlan::Skip {
            reason: SkipReason::AlreadyCurrent,
        };
    }

    let range = DateRange::new(requested.start.or(Some(tail_start)), requested.end);
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return FetchPlan::Skip {
                reason: SkipReason::AlreadyCurrent,
            };
        }
    }

    FetchPlan::Fetch {
        intent: FetchIntent::Tail,
        range,
    }
}

/// Tag bars whose date matches a split event. Returns the number tagged.
///
/// Prices are left as fetched; the source's adjusted columns already reflect the split.
pub fn apply_split_events(bars: &mut [Bar], events: &[SplitEvent]) -> usize {
    if events.is_empty() {
        return 0;
    }
    let mut tagged = 0;
    for bar in bars.iter_mut() {
        if events.iter().any(|e| e.date == bar.date) {
            bar.split = true;
            tagged += 1;
        }
    }
    tagged
}
