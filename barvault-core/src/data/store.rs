//! Per-symbol Parquet store.
//!
//! Layout: `{data_dir}/symbol={SYMBOL}/bars.parquet` plus `meta.json`
//!
//! - Each symbol directory is an independent unit; nothing is shared across symbols.
//! - Writes are atomic: write to `.tmp`, fsync, rename into place.
//! - `meta.json` holds the TickerSummary and the BLAKE3 hash of the series file
//!   it was computed from. A summary whose hash disagrees with the series on
//!   disk (crash between the two renames) is recomputed on read.
//! - Unreadable series files surface as `StorageCorruption` for that symbol only.

use super::ingest::fill_pct_change;
use super::provider::DataError;
use crate::domain::{is_strictly_ascending, Bar, DateRange, TickerSummary};
use crate::series::{canonicalize, merge_with_stats, MergeStats};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SERIES_FILE: &str = "bars.parquet";
const META_FILE: &str = "meta.json";
const DIR_PREFIX: &str = "symbol=";

const COLUMNS: [&str; 15] = [
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
];

/// Contents of `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SummaryRecord {
    #[serde(flatten)]
    summary: TickerSummary,
    series_hash: String,
}

pub struct TickerStore {
    data_dir: PathBuf,
}

impl TickerStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory for a symbol: `{data_dir}/symbol={SYMBOL}/`
    fn symbol_dir(&self, symbol: &str) -> Result<PathBuf, DataError> {
        validate_symbol(symbol)?;
        Ok(self.data_dir.join(format!("{DIR_PREFIX}{symbol}")))
    }

    fn series_path(&self, symbol: &str) -> Result<PathBuf, DataError> {
        Ok(self.symbol_dir(symbol)?.join(SERIES_FILE))
    }

    fn meta_path(&self, symbol: &str) -> Result<PathBuf, DataError> {
        Ok(self.symbol_dir(symbol)?.join(META_FILE))
    }

    /// True if a series file is present for `symbol`.
    pub fn exists(&self, symbol: &str) -> bool {
        self.series_path(symbol).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Load the stored series, optionally restricted to `range`.
    ///
    /// Unknown symbols return an empty series, not an error.
    pub fn get_series(
        &self,
        symbol: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.series_path(symbol)?;
        let Some(bytes) = read_if_present(&path)? else {
            return Ok(Vec::new());
        };
        let bars = decode_series(symbol, bytes)?;
        Ok(match range {
            Some(r) if !r.is_unbounded() => {
                bars.into_iter().filter(|b| r.contains(b.date)).collect()
            }
            _ => bars,
        })
    }

    /// Replace the stored series with `bars` and recompute the summary.
    ///
    /// `bars` must be non-empty, ascending and unique by date.
    pub fn write_series(&self, symbol: &str, bars: &[Bar]) -> Result<TickerSummary, DataError> {
        if bars.is_empty() {
            return Err(DataError::Validation(format!(
                "refusing to write an empty series for {symbol}"
            )));
        }
        if !is_strictly_ascending(bars) {
            return Err(DataError::Validation(format!(
                "series for {symbol} is not ascending and unique by date"
            )));
        }

        let hash = self.write_series_file(symbol, bars)?;
        let now = Utc::now().naive_utc();
        let summary = TickerSummary::from_series(symbol, bars, now).ok_or_else(|| {
            DataError::Validation(format!("no summary for empty series {symbol}"))
        })?;
        self.write_meta(symbol, &summary, hash)?;

        debug!(symbol, records = bars.len(), "series written");
        Ok(summary)
    }

    /// Merge `incoming` into the stored series (incoming wins per date) and persist.
    ///
    /// Percent change is recomputed over the merged series, so the first kept
    /// bar after a replaced window follows the new adjusted close. An empty
    /// `incoming` performs no write, so the summary's update time is unchanged.
    pub fn merge_series(&self, symbol: &str, incoming: &[Bar]) -> Result<MergeStats, DataError> {
        let existing = self.get_series(symbol, None)?;
        if incoming.is_empty() {
            return Ok(MergeStats {
                retained: existing.len(),
                ..MergeStats::default()
            });
        }

        let incoming = if is_strictly_ascending(incoming) {
            std::borrow::Cow::Borrowed(incoming)
        } else {
            debug!(symbol, "canonicalizing unsorted incoming bars");
            std::borrow::Cow::Owned(canonicalize(incoming.to_vec()))
        };

        let (mut merged, stats) = merge_with_stats(&existing, &incoming);
        fill_pct_change(&mut merged, None);
        self.write_series(symbol, &merged)?;
        info!(
            symbol,
            inserted = stats.inserted,
            replaced = stats.replaced,
            retained = stats.retained,
            "merged series"
        );
        Ok(stats)
    }

    /// Summary for `symbol`, or `None` if nothing is stored.
    pub fn get_summary(&self, symbol: &str) -> Result<Option<TickerSummary>, DataError> {
        let series_path = self.series_path(symbol)?;
        let Some(bytes) = read_if_present(&series_path)? else {
            return Ok(None);
        };
        let hash = blake3::hash(&bytes).to_hex().to_string();

        if let Some(record) = self.read_meta(symbol)? {
            if record.series_hash == hash {
                return Ok(Some(record.summary));
            }
            warn!(symbol, "summary does not match stored series; recomputing");
        } else {
            warn!(symbol, "summary missing for stored series; recomputing");
        }

        let bars = decode_series(symbol, bytes)?;
        let last_update = bars
            .iter()
            .map(|b| b.fetched_at)
            .max()
            .unwrap_or_else(|| Utc::now().naive_utc());
        let Some(summary) = TickerSummary::from_series(symbol, &bars, last_update) else {
            return Ok(None);
        };
        self.write_meta(symbol, &summary, hash)?;
        Ok(Some(summary))
    }

    /// Symbols with a stored series, from a directory scan.
    pub fn list_tickers(&self) -> Result<BTreeSet<String>, DataError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(DataError::Storage(format!("read dir: {e}"))),
        };

        let mut symbols = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Storage(format!("dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(symbol) = name.strip_prefix(DIR_PREFIX) else {
                continue;
            };
            if entry.path().join(SERIES_FILE).is_file() {
                symbols.insert(symbol.to_string());
            }
        }
        Ok(symbols)
    }

    /// Move an unreadable series aside (`bars.parquet.quarantined`) so it can be rebuilt.
    ///
    /// Returns false if there was nothing to move.
    pub fn quarantine(&self, symbol: &str) -> Result<bool, DataError> {
        let path = self.series_path(symbol)?;
        if !path.is_file() {
            return Ok(false);
        }
        let target = path.with_extension("parquet.quarantined");
        fs::rename(&path, &target)
            .map_err(|e| DataError::Storage(format!("quarantine {}: {e}", path.display())))?;
        let meta = self.meta_path(symbol)?;
        if meta.is_file() {
            fs::remove_file(&meta)
                .map_err(|e| DataError::Storage(format!("remove {}: {e}", meta.display())))?;
        }
        warn!(symbol, file = %target.display(), "quarantined stored series");
        Ok(true)
    }

    /// Encode and atomically replace the series file. Returns the file's hash.
    fn write_series_file(&self, symbol: &str, bars: &[Bar]) -> Result<String, DataError> {
        let dir = self.symbol_dir(symbol)?;
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Storage(format!("failed to create dir: {e}")))?;

        let bytes = encode_series(bars)?;
        let hash = blake3::hash(&bytes).to_hex().to_string();
        write_atomic(&dir.join(SERIES_FILE), &bytes)?;
        Ok(hash)
    }

    fn write_meta(
        &self,
        symbol: &str,
        summary: &TickerSummary,
        series_hash: String,
    ) -> Result<(), DataError> {
        let record = SummaryRecord {
            summary: summary.clone(),
            series_hash,
        };
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| DataError::Storage(format!("meta serialization: {e}")))?;
        write_atomic(&self.meta_path(symbol)?, &json)
    }

    fn read_meta(&self, symbol: &str) -> Result<Option<SummaryRecord>, DataError> {
        let Some(bytes) = read_if_present(&self.meta_path(symbol)?)? else {
            return Ok(None);
        };
        // An unparsable summary is recomputable, so treat it as missing.
        Ok(serde_json::from_slice(&bytes).ok())
    }
}

/// Symbols become directory names; keep them to a safe character set.
fn validate_symbol(symbol: &str) -> Result<(), DataError> {
    let ok = !symbol.is_empty()
        && symbol.len() <= 32
        && symbol != "."
        && symbol != ".."
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^'));
    if ok {
        Ok(())
    } else {
        Err(DataError::Validation(format!("invalid symbol '{symbol}'")))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

/// Write to `{path}.tmp`, fsync, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    let tmp = tmp_path(path);
    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()
    };
    write().map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::Storage(format!("write {}: {e}", tmp.display()))
    })?;

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::Storage(format!("atomic rename failed: {e}"))
    })
}

fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>, DataError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DataError::Storage(format!("read {}: {e}", path.display()))),
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Encode bars into an in-memory Parquet file.
fn encode_series(bars: &[Bar]) -> Result<Vec<u8>, DataError> {
    let mut df = bars_to_dataframe(bars)?;
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| DataError::Storage(format!("write parquet: {e}")))?;
    Ok(buf)
}

fn decode_series(symbol: &str, bytes: Vec<u8>) -> Result<Vec<Bar>, DataError> {
    let corrupt = |reason: String| DataError::StorageCorruption {
        symbol: symbol.to_string(),
        reason,
    };
    let df = ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| corrupt(format!("read parquet: {e}")))?;
    let bars = dataframe_to_bars(&df).map_err(corrupt)?;
    if !is_strictly_ascending(&bars) {
        return Err(corrupt("dates are not ascending and unique".into()));
    }
    Ok(bars)
}

fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, DataError> {
    let map_err = |e: PolarsError| DataError::Storage(format!("dataframe creation: {e}"));

    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let fetched: Vec<i64> = bars
        .iter()
        .map(|b| b.fetched_at.and_utc().timestamp_millis())
        .collect();
    let f = |get: fn(&Bar) -> f64| bars.iter().map(get).collect::<Vec<f64>>();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(map_err)?,
        Column::new("open".into(), f(|b| b.open)),
        Column::new("high".into(), f(|b| b.high)),
        Column::new("low".into(), f(|b| b.low)),
        Column::new("close".into(), f(|b| b.close)),
        Column::new("volume".into(), bars.iter().map(|b| b.volume).collect::<Vec<u64>>()),
        Column::new("adj_open".into(), f(|b| b.adj_open)),
        Column::new("adj_high".into(), f(|b| b.adj_high)),
        Column::new("adj_low".into(), f(|b| b.adj_low)),
        Column::new("adj_close".into(), f(|b| b.adj_close)),
        Column::new(
            "adj_volume".into(),
            bars.iter().map(|b| b.adj_volume).collect::<Vec<u64>>(),
        ),
        Column::new(
            "pct_change".into(),
            bars.iter().map(|b| b.pct_change).collect::<Vec<Option<f64>>>(),
        ),
        Column::new("split".into(), bars.iter().map(|b| b.split).collect::<Vec<bool>>()),
        Column::new(
            "source".into(),
            bars.iter().map(|b| b.source.as_str()).collect::<Vec<&str>>(),
        ),
        Column::new("fetched_at".into(), fetched)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(map_err)?,
    ])
    .map_err(map_err)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, String> {
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(format!("missing column '{name}'"));
        }
    }

    let column = |name: &str, dtype: &DataType| -> Result<Column, String> {
        df.column(name)
            .and_then(|c| c.cast(dtype))
            .map_err(|e| format!("{name} column: {e}"))
    };
    let type_err = |e: PolarsError| format!("column type: {e}");

    let date_col = column("date", &DataType::Int32)?;
    let date_ca = date_col.i32().map_err(type_err)?;
    let fetched_col = column("fetched_at", &DataType::Int64)?;
    let fetched_ca = fetched_col.i64().map_err(type_err)?;
    let volume_col = column("volume", &DataType::UInt64)?;
    let volume_ca = volume_col.u64().map_err(type_err)?;
    let adj_volume_col = column("adj_volume", &DataType::UInt64)?;
    let adj_volume_ca = adj_volume_col.u64().map_err(type_err)?;
    let split_col = column("split", &DataType::Boolean)?;
    let split_ca = split_col.bool().map_err(type_err)?;
    let source_col = column("source", &DataType::String)?;
    let source_ca = source_col.str().map_err(type_err)?;
    let pct_col = column("pct_change", &DataType::Float64)?;
    let pct_ca = pct_col.f64().map_err(type_err)?;

    const PRICES: [&str; 8] = [
        "open", "high", "low", "close", "adj_open", "adj_high", "adj_low", "adj_close",
    ];
    let mut price_cols = Vec::with_capacity(PRICES.len());
    for name in PRICES {
        price_cols.push(column(name, &DataType::Float64)?);
    }
    let mut prices = Vec::with_capacity(PRICES.len());
    for col in &price_cols {
        prices.push(col.f64().map_err(type_err)?);
    }

    let n = df.height();
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let mut p = [0.0f64; 8];
        for (k, ca) in prices.iter().enumerate() {
            p[k] = required(ca.get(i), PRICES[k], i)?;
        }
        let days = required(date_ca.get(i), "date", i)?;
        let millis = required(fetched_ca.get(i), "fetched_at", i)?;

        bars.push(Bar {
            date: epoch() + chrono::Duration::days(days as i64),
            open: p[0],
            high: p[1],
            low: p[2],
            close: p[3],
            volume: required(volume_ca.get(i), "volume", i)?,
            adj_open: p[4],
            adj_high: p[5],
            adj_low: p[6],
            adj_close: p[7],
            adj_volume: required(adj_volume_ca.get(i), "adj_volume", i)?,
            pct_change: pct_ca.get(i),
            split: split_ca.get(i).unwrap_or(false),
            source: required(source_ca.get(i), "source", i)?.to_string(),
            fetched_at: millis_to_naive(millis)
                .ok_or_else(|| format!("invalid fetched_at at row {i}"))?,
        });
    }

    Ok(bars)
}

fn required<T>(value: Option<T>, name: &str, row: usize) -> Result<T, String> {
    value.ok_or_else(|| format!("null {name} at row {row}"))
}

fn millis_to_naive(millis: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::fixtures::bar;

    fn sample_bars() -> Vec<Bar> {
        let mut bars = vec![
            bar("2024-01-02", 100.0),
            bar("2024-01-03", 101.0),
            bar("2024-01-04", 102.0),
        ];
        bars[1].pct_change = Some(1.0);
        bars[2].split = true;
        bars
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());

        store.write_series("SPY", &sample_bars()).unwrap();
        let loaded = store.get_series("SPY", None).unwrap();

        assert_eq!(loaded, sample_bars());
        assert!(store.exists("SPY"));
    }

    #[test]
    fn unknown_symbol_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());

        assert!(store.get_series("NOPE", None).unwrap().is_empty());
        assert!(store.get_summary("NOPE").unwrap().is_none());
        assert!(!store.exists("NOPE"));
    }

    #[test]
    fn range_filter_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();

        let range = DateRange::new(Some(d("2024-01-03")), Some(d("2024-01-04")));
        let bars = store.get_series("SPY", Some(range)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d("2024-01-03"));
    }

    #[test]
    fn summary_tracks_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());

        let written = store.write_series("SPY", &sample_bars()).unwrap();
        let summary = store.get_summary("SPY").unwrap().unwrap();
        assert_eq!(summary, written);
        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.first_date, d("2024-01-02"));
        assert_eq!(summary.last_date, d("2024-01-04"));
    }

    #[test]
    fn merge_with_empty_incoming_does_not_touch_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();
        let before = store.get_summary("SPY").unwrap().unwrap();

        let stats = store.merge_series("SPY", &[]).unwrap();

        assert_eq!(stats.retained, 3);
        assert_eq!(store.get_summary("SPY").unwrap().unwrap(), before);
    }

    #[test]
    fn merge_extends_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();

        let incoming = vec![bar("2024-01-04", 200.0), bar("2024-01-05", 201.0)];
        let stats = store.merge_series("SPY", &incoming).unwrap();

        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.inserted, 1);
        let loaded = store.get_series("SPY", None).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[2].close, 200.0);
        assert_eq!(store.get_summary("SPY").unwrap().unwrap().record_count, 4);
    }

    #[test]
    fn replacing_a_window_refreshes_the_next_pct_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        let mut bars = sample_bars();
        fill_pct_change(&mut bars, None);
        store.write_series("SPY", &bars).unwrap();

        // Re-fetch only the middle day with a new adjusted close.
        let mut window = vec![bar("2024-01-03", 51.0)];
        fill_pct_change(&mut window, Some(100.0));
        store.merge_series("SPY", &window).unwrap();

        let loaded = store.get_series("SPY", None).unwrap();
        assert_eq!(loaded[0].pct_change, None);
        assert!((loaded[1].pct_change.unwrap() + 49.0).abs() < 1e-9);
        // 51 → 102 after the replaced day.
        assert!((loaded[2].pct_change.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_and_unsorted_writes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        assert!(store.write_series("SPY", &[]).is_err());

        let mut bars = sample_bars();
        bars.reverse();
        assert!(store.write_series("SPY", &bars).is_err());
        assert!(!store.exists("SPY"));
    }

    #[test]
    fn list_tickers_scans_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();
        store.write_series("QQQ", &sample_bars()).unwrap();
        fs::create_dir_all(dir.path().join("symbol=EMPTY")).unwrap();
        fs::write(dir.path().join("registry.json"), "{}").unwrap();

        let tickers: Vec<String> = store.list_tickers().unwrap().into_iter().collect();
        assert_eq!(tickers, vec!["QQQ".to_string(), "SPY".to_string()]);
    }

    #[test]
    fn missing_data_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path().join("not-there"));
        assert!(store.list_tickers().unwrap().is_empty());
    }

    #[test]
    fn crash_before_rename_leaves_previous_series_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();
        let before = store.get_summary("SPY").unwrap().unwrap();

        // A writer died after producing the temp file but before renaming it.
        let series = store.series_path("SPY").unwrap();
        fs::write(tmp_path(&series), b"half-written parquet").unwrap();

        assert_eq!(store.get_series("SPY", None).unwrap(), sample_bars());
        assert_eq!(store.get_summary("SPY").unwrap().unwrap(), before);
        assert_eq!(store.list_tickers().unwrap().len(), 1);

        // The next write replaces the stray temp file.
        store.merge_series("SPY", &[bar("2024-01-05", 103.0)]).unwrap();
        assert_eq!(store.get_series("SPY", None).unwrap().len(), 4);
    }

    #[test]
    fn crash_between_renames_is_healed_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();

        // Series replaced, summary rename never happened.
        let mut longer = sample_bars();
        longer.push(bar("2024-01-05", 103.0));
        store.write_series_file("SPY", &longer).unwrap();

        let summary = store.get_summary("SPY").unwrap().unwrap();
        assert_eq!(summary.record_count, 4);
        assert_eq!(summary.last_date, d("2024-01-05"));
    }

    #[test]
    fn corrupt_file_is_isolated_and_quarantinable() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        store.write_series("SPY", &sample_bars()).unwrap();
        store.write_series("QQQ", &sample_bars()).unwrap();

        fs::write(store.series_path("SPY").unwrap(), b"not parquet").unwrap();

        assert!(matches!(
            store.get_series("SPY", None),
            Err(DataError::StorageCorruption { .. })
        ));
        assert!(store.merge_series("SPY", &[bar("2024-01-05", 1.0)]).is_err());
        assert_eq!(store.get_series("QQQ", None).unwrap().len(), 3);

        assert!(store.quarantine("SPY").unwrap());
        assert!(!store.exists("SPY"));
        assert!(store.get_series("SPY", None).unwrap().is_empty());
        assert!(!store.quarantine("SPY").unwrap());
    }

    #[test]
    fn path_like_symbols_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickerStore::new(dir.path());
        assert!(store.write_series("../etc", &sample_bars()).is_err());
        assert!(store.get_series("a/b", None).is_err());
        assert!(!store.exists(".."));
        assert!(store.write_series("BRK.B", &sample_bars()).is_ok());
    }
}
