//! Ingest: raw provider bars → schema bars.
//!
//! Sorts and de-duplicates by date, drops bars that fail the sanity check,
//! computes the adjusted close-to-close percent change and stamps every bar
//! with its source tag and retrieval time.

use super::provider::RawBar;
use crate::domain::Bar;
use crate::series::canonicalize;
use chrono::NaiveDateTime;
use tracing::warn;

/// Output of [`ingest`].
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// Ascending, unique-by-date bars ready to merge.
    pub bars: Vec<Bar>,
    /// Number of raw bars dropped as invalid.
    pub rejected: usize,
}

/// Convert fetched bars into schema bars.
///
/// `previous_adj_close` seeds the percent change of the first bar; pass the
/// last stored adjusted close when the fetch starts right after the stored series.
pub fn ingest(
    symbol: &str,
    raw: Vec<RawBar>,
    source: &str,
    fetched_at: NaiveDateTime,
    previous_adj_close: Option<f64>,
) -> IngestResult {
    let total = raw.len();
    let bars: Vec<Bar> = raw
        .into_iter()
        .map(|r| Bar {
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            adj_open: r.adj_open,
            adj_high: r.adj_high,
            adj_low: r.adj_low,
            adj_close: r.adj_close,
            adj_volume: r.adj_volume,
            pct_change: None,
            split: false,
            source: source.to_string(),
            fetched_at,
        })
        .filter(Bar::is_sane)
        .collect();

    let rejected = total - bars.len();
    if rejected > 0 {
        warn!(symbol, rejected, "dropped invalid bars during ingest");
    }

    let mut bars = canonicalize(bars);
    fill_pct_change(&mut bars, previous_adj_close);

    IngestResult { bars, rejected }
}

/// Percent change of adjusted close versus the previous bar.
pub fn fill_pct_change(bars: &mut [Bar], mut previous_adj_close: Option<f64>) {
    for bar in bars.iter_mut() {
        bar.pct_change = previous_adj_close
            .filter(|prev| *prev > 0.0)
            .map(|prev| (bar.adj_close / prev - 1.0) * 100.0);
        previous_adj_close = Some(bar.adj_close);
    }
}
