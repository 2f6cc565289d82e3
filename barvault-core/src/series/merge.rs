//! Time-series merge: union by date, incoming bars win on collision.
//!
//! The latest fetch is authoritative because the upstream source rewrites
//! adjusted prices after later splits and dividends. There is no field-level
//! merge; a colliding incoming bar replaces the stored bar entirely.

use crate::domain::Bar;
use std::cmp::Ordering;

/// What a merge did, for logging and reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Incoming bars on dates the existing series did not have.
    pub inserted: usize,
    /// Incoming bars that replaced an existing bar on the same date.
    pub replaced: usize,
    /// Existing bars kept because no incoming bar collided.
    pub retained: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.inserted + self.replaced + self.retained
    }
}

/// Merge `incoming` into `existing`. Both must be ascending and unique by date.
pub fn merge(existing: &[Bar], incoming: &[Bar]) -> Vec<Bar> {
    merge_with_stats(existing, incoming).0
}

/// [`merge`], also reporting how many bars were inserted, replaced and retained.
pub fn merge_with_stats(existing: &[Bar], incoming: &[Bar]) -> (Vec<Bar>, MergeStats) {
    let mut stats = MergeStats::default();
    if incoming.is_empty() {
        stats.retained = existing.len();
        return (existing.to_vec(), stats);
    }

    let mut out = Vec::with_capacity(existing.len() + incoming.len());
    let (mut i, mut j) = (0, 0);

    while i < existing.len() && j < incoming.len() {
        match existing[i].date.cmp(&incoming[j].date) {
            Ordering::Less => {
                out.push(existing[i].clone());
                stats.retained += 1;
                i += 1;
            }
            Ordering::Greater => {
                out.push(incoming[j].clone());
                stats.inserted += 1;
                j += 1;
            }
            Ordering::Equal => {
                out.push(incoming[j].clone());
                stats.replaced += 1;
                i += 1;
                j += 1;
            }
        }
    }

    stats.retained += existing.len() - i;
    stats.inserted += incoming.len() - j;
    out.extend_from_slice(&existing[i..]);
    out.extend_from_slice(&incoming[j..]);

    (out, stats)
}

/// Sort by date and collapse duplicate dates, keeping the last occurrence.
///
/// Used on raw provider output before it is handed to [`merge`], which
/// assumes unique-by-date inputs.
pub fn canonicalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    // Stable sort keeps input order among equal dates, so the last one wins below.
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::fixtures::bar;

    #[test]
    fn incoming_wins_on_collision() {
        let existing = vec![bar("2024-01-02", 10.0), bar("2024-01-03", 11.0)];
        let incoming = vec![bar("2024-01-03", 99.0), bar("2024-01-04", 12.0)];

        let (merged, stats) = merge_with_stats(&existing, &incoming);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].close, 99.0);
        assert_eq!(
            stats,
            MergeStats {
                inserted: 1,
                replaced: 1,
                retained: 1
            }
        );
        assert_eq!(stats.total(), merged.len());
    }

    #[test]
    fn backfilled_days_interleave() {
        let existing = vec![bar("2024-01-02", 10.0), bar("2024-01-05", 13.0)];
        let incoming = vec![bar("2024-01-03", 11.0), bar("2024-01-04", 12.0)];
        let merged = merge(&existing, &incoming);
        let closes: Vec<f64> = merged.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn empty_incoming_is_noop() {
        let existing = vec![bar("2024-01-02", 10.0)];
        let (merged, stats) = merge_with_stats(&existing, &[]);
        assert_eq!(merged, existing);
        assert_eq!(stats.retained, 1);
        assert_eq!(stats.inserted + stats.replaced, 0);
    }

    #[test]
    fn canonicalize_sorts_and_keeps_last_duplicate() {
        let raw = vec![
            bar("2024-01-04", 12.0),
            bar("2024-01-02", 10.0),
            bar("2024-01-04", 42.0),
        ];
        let out = canonicalize(raw);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].close, 10.0);
        assert_eq!(out[1].close, 42.0);
    }
}
