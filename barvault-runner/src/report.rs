//! Inspection and export of stored series.
//!
//! - **Inspection**: summary plus gap listing, split into significant and minor
//! - **CSV**: one row per bar, for spreadsheets and external tools

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use barvault_core::data::{DataError, TickerStore};
use barvault_core::domain::{Bar, TickerSummary};
use barvault_core::series::{series_gaps, split_significant, Gap};
use serde::Serialize;

/// Everything the `info` command reports for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub summary: TickerSummary,
    pub gaps: Vec<Gap>,
    pub significant_gaps: Vec<Gap>,
    pub significant_threshold: u32,
}

impl InspectionReport {
    pub fn missing_days(&self) -> u32 {
        self.gaps.iter().map(|g| g.days).sum()
    }
}

/// Inspect `symbol`. `None` when nothing is stored.
pub fn inspect(
    store: &TickerStore,
    symbol: &str,
    significant_threshold: u32,
) -> Result<Option<InspectionReport>, DataError> {
    let Some(summary) = store.get_summary(symbol)? else {
        return Ok(None);
    };
    let bars = store.get_series(symbol, None)?;
    let gaps = series_gaps(&bars);
    let (significant_gaps, _) = split_significant(&gaps, significant_threshold);

    Ok(Some(InspectionReport {
        summary,
        gaps,
        significant_gaps,
        significant_threshold,
    }))
}

/// Summaries of every stored symbol. Unreadable symbols carry their error.
pub fn list_summaries(
    store: &TickerStore,
) -> Result<Vec<(String, Result<Option<TickerSummary>, DataError>)>, DataError> {
    Ok(store
        .list_tickers()?
        .into_iter()
        .map(|symbol| {
            let summary = store.get_summary(&symbol);
            (symbol, summary)
        })
        .collect())
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Render bars as CSV.
///
/// Columns: date, open, high, low, close, volume, adj_open, adj_high, adj_low,
/// adj_close, adj_volume, pct_change, split, source, fetched_at
pub fn series_to_csv(bars: &[Bar]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "date",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "adj_open",
        "adj_high",
        "adj_low",
        "adj_close",
        "adj_volume",
        "pct_change",
        "split",
        "source",
        "fetched_at",
    ])?;

    for b in bars {
        wtr.write_record([
            &b.date.to_string(),
            &format!("{:.4}", b.open),
            &format!("{:.4}", b.high),
            &format!("{:.4}", b.low),
            &format!("{:.4}", b.close),
            &b.volume.to_string(),
            &format!("{:.6}", b.adj_open),
            &format!("{:.6}", b.adj_high),
            &format!("{:.6}", b.adj_low),
            &format!("{:.6}", b.adj_close),
            &b.adj_volume.to_string(),
            &b.pct_change.map(|p| format!("{p:.6}")).unwrap_or_default(),
            &b.split.to_string(),
            &b.source,
            &b.fetched_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Write the stored series for `symbol` to `path`. Returns the number of rows.
pub fn export_series(store: &TickerStore, symbol: &str, path: &Path) -> Result<usize> {
    let bars = store
        .get_series(symbol, None)
        .with_context(|| format!("failed to load {symbol}"))?;
    anyhow::ensure!(!bars.is_empty(), "no stored data for {symbol}");

    let csv = series_to_csv(&bars)?;
    fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(bars.len())
}

/// Pretty JSON for an inspection report.
pub fn report_json(report: &InspectionReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize inspection report")
}
