//! Ticker registry — reference metadata for every symbol the store knows about.
//!
//! Persisted as `{data_dir}/registry.json`, a map from symbol to
//! [`TickerMetadata`]. Entries come from the price source after a first
//! successful fetch, or in bulk from a CSV file.

use super::provider::DataError;
use super::store::write_atomic;
use crate::domain::{normalize_symbol, TickerMetadata};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerRegistry {
    entries: BTreeMap<String, TickerMetadata>,
}

/// One row of a registry import file.
#[derive(Debug, Deserialize)]
struct CsvRow {
    symbol: String,
    name: String,
    exchange: String,
    #[serde(default)]
    sector: Option<String>,
}

impl TickerRegistry {
    /// Load the registry at `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(DataError::Registry(format!("read {}: {e}", path.display()))),
        };
        serde_json::from_str(&content)
            .map_err(|e| DataError::Registry(format!("parse {}: {e}", path.display())))
    }

    /// Write the registry atomically (tmp + rename).
    pub fn save(&self, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DataError::Registry(format!("create dir: {e}")))?;
        }
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| DataError::Registry(format!("serialize registry: {e}")))?;
        write_atomic(path, &json).map_err(|e| DataError::Registry(e.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(&normalize_symbol(symbol))
    }

    /// True if `symbol` has no entry yet.
    pub fn needs_registration(&self, symbol: &str) -> bool {
        !self.contains(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&TickerMetadata> {
        self.entries.get(&normalize_symbol(symbol))
    }

    /// Insert or replace the entry for `metadata.symbol`, stamping `registered_at`
    /// if the caller left it empty.
    pub fn register(&mut self, mut metadata: TickerMetadata, now: NaiveDateTime) {
        metadata.symbol = normalize_symbol(&metadata.symbol);
        metadata.registered_at.get_or_insert(now);
        debug!(symbol = %metadata.symbol, "registered");
        self.entries.insert(metadata.symbol.clone(), metadata);
    }

    /// Register every row of a CSV file with columns `symbol,name,exchange,sector`.
    ///
    /// Returns the number of rows imported. Rows for symbols already present
    /// replace the existing name, exchange and sector.
    pub fn import_csv(&mut self, path: &Path, now: NaiveDateTime) -> Result<usize, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::Registry(format!("open {}: {e}", path.display())))?;

        let mut count = 0;
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| DataError::Registry(format!("row {}: {e}", line + 1)))?;
            let symbol = normalize_symbol(&row.symbol);
            if symbol.is_empty() {
                return Err(DataError::Registry(format!("row {}: empty symbol", line + 1)));
            }

            let mut metadata = self.entries.remove(&symbol).unwrap_or_else(|| TickerMetadata {
                symbol: symbol.clone(),
                name: String::new(),
                exchange: String::new(),
                sector: None,
                description: None,
                listed_from: None,
                listed_until: None,
                registered_at: None,
            });
            metadata.name = row.name;
            metadata.exchange = row.exchange;
            metadata.sector = row.sector.filter(|s| !s.is_empty());
            self.register(metadata, now);
            count += 1;
        }

        info!(count, file = %path.display(), "imported registry entries");
        Ok(count)
    }

    /// Entries in symbol order.
    pub fn list(&self) -> impl Iterator<Item = &TickerMetadata> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn meta(symbol: &str) -> TickerMetadata {
        TickerMetadata {
            symbol: symbol.into(),
            name: format!("{symbol} Inc"),
            exchange: "NYSE".into(),
            sector: None,
            description: None,
            listed_from: None,
            listed_until: None,
            registered_at: None,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = TickerRegistry::load(&dir.path().join("registry.json")).unwrap();
        assert!(reg.is_empty());
        assert!(reg.needs_registration("SPY"));
    }

    #[test]
    fn register_normalizes_and_stamps() {
        let mut reg = TickerRegistry::default();
        reg.register(meta("spy"), now());

        assert!(reg.contains("SPY"));
        assert!(reg.contains(" spy "));
        assert_eq!(reg.get("SPY").unwrap().registered_at, Some(now()));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.json");
        let mut reg = TickerRegistry::default();
        reg.register(meta("AAPL"), now());
        reg.register(meta("MSFT"), now());
        reg.save(&path).unwrap();

        let loaded = TickerRegistry::load(&path).unwrap();
        let symbols: Vec<&str> = loaded.list().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
        assert!(!dir.path().join("nested").join("registry.json.tmp").exists());
    }

    #[test]
    fn import_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickers.csv");
        fs::write(
            &path,
            "symbol,name,exchange,sector\n\
             spy,SPDR S&P 500,NYSE ARCA,\n\
             AAPL, Apple Inc ,NASDAQ,Technology\n",
        )
        .unwrap();

        let mut reg = TickerRegistry::default();
        reg.register(meta("AAPL"), now());
        let count = reg.import_csv(&path, now()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(reg.len(), 2);
        let aapl = reg.get("AAPL").unwrap();
        assert_eq!(aapl.name, "Apple Inc");
        assert_eq!(aapl.sector.as_deref(), Some("Technology"));
        assert_eq!(reg.get("SPY").unwrap().sector, None);
    }

    #[test]
    fn import_csv_rejects_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "ticker\nSPY\n").unwrap();

        let mut reg = TickerRegistry::default();
        assert!(reg.import_csv(&path, now()).is_err());
    }
}
