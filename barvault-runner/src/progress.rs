//! Progress callbacks for batch updates.

use crate::update::{BatchReport, UpdateOutcome};

/// Progress callback for multi-symbol updates.
///
/// Symbols run on a worker pool, so callbacks may arrive out of order and
/// from several threads at once.
pub trait UpdateProgress: Send + Sync {
    /// Called when work on a symbol begins.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol finishes, whatever the outcome.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, outcome: &UpdateOutcome);

    /// Called once after every symbol has finished.
    fn on_batch_complete(&self, report: &BatchReport);
}

/// Prints one line per symbol to stdout.
pub struct StdoutProgress;

impl UpdateProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] {symbol}...", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Failed { .. } => println!("  FAIL: {symbol}: {outcome}"),
            _ => println!("  OK: {symbol}: {outcome}"),
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        println!(
            "\nUpdate complete: {} fetched, {} unchanged, {} skipped, {} failed ({} total)",
            report.fetched(),
            report.no_new_data(),
            report.skipped(),
            report.failed(),
            report.results.len()
        );
    }
}

/// Discards all progress events.
pub struct NoProgress;

impl UpdateProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}
    fn on_complete(&self, _symbol: &str, _index: usize, _total: usize, _outcome: &UpdateOutcome) {}
    fn on_batch_complete(&self, _report: &BatchReport) {}
}
