//! BarVault Runner — batch updates and reporting on top of `barvault-core`.
//!
//! This crate provides:
//! - The multi-symbol update orchestrator (bounded worker pool, per-symbol isolation)
//! - Progress callbacks for batch updates
//! - Inspection reports and CSV export of stored series

pub mod progress;
pub mod report;
pub mod update;

pub use progress::{NoProgress, StdoutProgress, UpdateProgress};
pub use report::{export_series, inspect, list_summaries, series_to_csv, InspectionReport};
pub use update::{
    normalize_batch, BatchReport, SymbolReport, UpdateOptions, UpdateOutcome, Updater,
};
