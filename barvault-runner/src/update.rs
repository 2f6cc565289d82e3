//! Batch update orchestrator: plan → fetch → ingest → store, per symbol.
//!
//! Symbols are normalized and de-duplicated before scheduling, so each one is
//! owned by exactly one worker and its stored series is never written
//! concurrently. A failure for one symbol is recorded in the report and the
//! rest of the batch carries on.

use crate::progress::UpdateProgress;
use barvault_core::config::AppConfig;
use barvault_core::data::{ingest, DataError, PriceSource, TickerRegistry, TickerStore};
use barvault_core::domain::{normalize_symbol, Bar, DateRange, Symbol};
use barvault_core::planner::{
    apply_split_events, plan_fetch, FetchIntent, FetchPlan, PlanMode, SkipReason,
};
use barvault_core::series::MergeStats;
use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Options for one batch update.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub range: DateRange,
    pub mode: PlanMode,
    /// Reference date for tail planning.
    pub today: NaiveDate,
    pub backfill_min_gap_days: u32,
    pub max_concurrency: usize,
    /// Ask the source for split events over the fetched span and tag matching bars.
    pub tag_splits: bool,
}

impl UpdateOptions {
    pub fn from_config(
        config: &AppConfig,
        range: DateRange,
        mode: PlanMode,
        today: NaiveDate,
    ) -> Self {
        Self {
            range,
            mode,
            today,
            backfill_min_gap_days: config.backfill_min_gap_days,
            max_concurrency: config.max_concurrency,
            tag_splits: true,
        }
    }
}

/// What happened to one symbol.
#[derive(Debug)]
pub enum UpdateOutcome {
    Fetched {
        records: usize,
        intent: FetchIntent,
        stats: MergeStats,
    },
    /// The fetch succeeded but returned nothing usable; the store was not touched.
    NoNewData { intent: FetchIntent },
    Skipped { reason: SkipReason },
    Failed { error: DataError },
}

impl UpdateOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetched { records, intent, .. } => {
                write!(f, "fetched {records} records ({intent})")
            }
            Self::NoNewData { .. } => f.write_str("no new data"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { error } => write!(f, "error: {error}"),
        }
    }
}

#[derive(Debug)]
pub struct SymbolReport {
    pub symbol: Symbol,
    pub outcome: UpdateOutcome,
}

/// Per-symbol results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<SymbolReport>,
    /// Symbols newly added to the registry during this batch.
    pub registered: Vec<Symbol>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&UpdateOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn fetched(&self) -> usize {
        self.count(|o| matches!(o, UpdateOutcome::Fetched { .. }))
    }

    pub fn no_new_data(&self) -> usize {
        self.count(|o| matches!(o, UpdateOutcome::NoNewData { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, UpdateOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(UpdateOutcome::is_failure)
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.outcome.is_failure())
    }

    pub fn outcome(&self, symbol: &str) -> Option<&UpdateOutcome> {
        self.results
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.outcome)
    }
}

/// Normalize symbols and drop blanks and duplicates, keeping first-seen order.
pub fn normalize_batch<S: AsRef<str>>(symbols: &[S]) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Shared collaborators for a batch.
pub struct Updater<'a> {
    source: &'a dyn PriceSource,
    store: &'a TickerStore,
    registry: Option<&'a Mutex<TickerRegistry>>,
}

impl<'a> Updater<'a> {
    pub fn new(source: &'a dyn PriceSource, store: &'a TickerStore) -> Self {
        Self {
            source,
            store,
            registry: None,
        }
    }

    /// Register symbols that are fetched successfully and missing from `registry`.
    pub fn with_registry(mut self, registry: &'a Mutex<TickerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Update every symbol in `symbols` on a pool of `options.max_concurrency` workers.
    ///
    /// Only pool construction can fail; per-symbol errors land in the report.
    pub fn run<S: AsRef<str>>(
        &self,
        symbols: &[S],
        options: &UpdateOptions,
        progress: &dyn UpdateProgress,
    ) -> Result<BatchReport, DataError> {
        let symbols = normalize_batch(symbols);
        let total = symbols.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_concurrency.max(1))
            .build()
            .map_err(|e| DataError::Other(format!("worker pool: {e}")))?;

        info!(
            total,
            workers = options.max_concurrency,
            source = self.source.name(),
            "starting update"
        );

        let outcomes: Vec<(UpdateOutcome, bool)> = pool.install(|| {
            symbols
                .par_iter()
                .enumerate()
                .map(|(i, symbol)| {
                    progress.on_start(symbol, i, total);
                    let outcome = self.update_one(symbol, options);
                    let registered = matches!(outcome, UpdateOutcome::Fetched { .. })
                        && self.register_if_needed(symbol);
                    progress.on_complete(symbol, i, total, &outcome);
                    (outcome, registered)
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (symbol, (outcome, registered)) in symbols.into_iter().zip(outcomes) {
            if registered {
                report.registered.push(symbol.clone());
            }
            report.results.push(SymbolReport { symbol, outcome });
        }

        info!(
            fetched = report.fetched(),
            skipped = report.skipped(),
            failed = report.failed(),
            "update finished"
        );
        progress.on_batch_complete(&report);
        Ok(report)
    }

    /// Plan, fetch and persist one symbol.
    pub fn update_one(&self, symbol: &str, options: &UpdateOptions) -> UpdateOutcome {
        match self.try_update(symbol, options) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(symbol, %error, "update failed");
                UpdateOutcome::Failed { error }
            }
        }
    }

    fn try_update(
        &self,
        symbol: &str,
        options: &UpdateOptions,
    ) -> Result<UpdateOutcome, DataError> {
        let existing = self.load_existing(symbol, options.mode)?;
        let plan = plan_fetch(
            symbol,
            Some(existing.as_slice()),
            options.range,
            options.mode,
            options.today,
            options.backfill_min_gap_days,
        );

        let (intent, range) = match plan {
            FetchPlan::Skip { reason } => {
                debug!(symbol, %reason, "skipping");
                return Ok(UpdateOutcome::Skipped { reason });
            }
            FetchPlan::Fetch { intent, range } => (intent, range),
        };

        if !self.source.is_available() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let raw = self.source.fetch_daily(symbol, range.start, range.end)?;
        if raw.is_empty() {
            info!(symbol, %intent, "fetch returned no bars");
            return Ok(UpdateOutcome::NoNewData { intent });
        }

        let first_date = raw.iter().map(|r| r.date).min();
        let seed = previous_adj_close(&existing, first_date);
        let fetched_at = Utc::now().naive_utc();
        let mut result = ingest(symbol, raw, self.source.name(), fetched_at, seed);
        if result.bars.is_empty() {
            warn!(symbol, rejected = result.rejected, "every fetched bar was rejected");
            return Ok(UpdateOutcome::NoNewData { intent });
        }

        if options.tag_splits {
            self.tag_splits(symbol, &mut result.bars);
        }

        let records = result.bars.len();
        let stats = if existing.is_empty() {
            self.store.write_series(symbol, &result.bars)?;
            MergeStats {
                inserted: records,
                ..MergeStats::default()
            }
        } else {
            self.store.merge_series(symbol, &result.bars)?
        };

        info!(symbol, %intent, records, "stored");
        Ok(UpdateOutcome::Fetched {
            records,
            intent,
            stats,
        })
    }

    /// Stored series for planning. A corrupt series is quarantined when the
    /// caller forces a re-fetch, otherwise it fails this symbol.
    fn load_existing(&self, symbol: &str, mode: PlanMode) -> Result<Vec<Bar>, DataError> {
        match self.store.get_series(symbol, None) {
            Ok(bars) => Ok(bars),
            Err(DataError::StorageCorruption { reason, .. }) if mode.force => {
                warn!(symbol, %reason, "stored series unreadable; rebuilding");
                self.store.quarantine(symbol)?;
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Best effort: a failed split lookup is logged and the bars are stored untagged.
    ///
    /// Only the span of `bars` is asked for, never the full listing history.
    fn tag_splits(&self, symbol: &str, bars: &mut [Bar]) {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return;
        };
        match self
            .source
            .fetch_split_events(symbol, Some(first.date), Some(last.date))
        {
            Ok(events) => {
                let tagged = apply_split_events(bars, &events);
                if tagged > 0 {
                    debug!(symbol, tagged, "tagged split bars");
                }
            }
            Err(e) => warn!(symbol, error = %e, "split lookup failed"),
        }
    }

    /// Returns true if the symbol was newly registered.
    fn register_if_needed(&self, symbol: &str) -> bool {
        let Some(registry) = self.registry else {
            return false;
        };
        let needed = registry
            .lock()
            .map(|r| r.needs_registration(symbol))
            .unwrap_or(false);
        if !needed {
            return false;
        }

        match self.source.fetch_metadata(symbol) {
            Ok(metadata) => match registry.lock() {
                Ok(mut r) => {
                    r.register(metadata, Utc::now().naive_utc());
                    true
                }
                Err(_) => false,
            },
            Err(e) => {
                warn!(symbol, error = %e, "metadata lookup failed; not registered");
                false
            }
        }
    }
}

/// Adjusted close of the last stored bar before `first_date`, seeding the
/// percent change of the first fetched bar.
fn previous_adj_close(existing: &[Bar], first_date: Option<NaiveDate>) -> Option<f64> {
    let first = first_date?;
    existing
        .iter()
        .rev()
        .find(|b| b.date < first)
        .map(|b| b.adj_close)
}
