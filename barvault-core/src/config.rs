//! Application configuration.
//!
//! Built once at process start from an optional TOML file plus environment
//! overrides, then passed by reference into every component. Nothing below
//! this module reads the environment.

use crate::data::provider::DataError;
use crate::series::DEFAULT_SIGNIFICANT_GAP_DAYS;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "BARVAULT_API_KEY";
pub const ENV_DATA_DIR: &str = "BARVAULT_DATA_DIR";

pub const DEFAULT_BASE_URL: &str = "https://api.tiingo.com";

/// Upper bound on `max_retries`; backoff doubles per attempt.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Resolved configuration.
#[derive(Debug)]
pub struct AppConfig {
    /// Root of the per-symbol store and the registry file.
    pub data_dir: PathBuf,
    /// Static API key for the price source.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Upper bound on simultaneous in-flight fetches.
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    /// Gaps with more missing trading days than this are significant.
    pub significant_gap_days: u32,
    /// Only gaps with more missing trading days than this trigger a backfill.
    /// Zero means any gap does.
    pub backfill_min_gap_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrency: 4,
            request_timeout_secs: 30,
            max_retries: 3,
            significant_gap_days: DEFAULT_SIGNIFICANT_GAP_DAYS,
            backfill_min_gap_days: 0,
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    api_key: Option<String>,
    base_url: Option<String>,
    max_concurrency: Option<usize>,
    request_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    significant_gap_days: Option<u32>,
    backfill_min_gap_days: Option<u32>,
}

impl AppConfig {
    /// Parse a TOML config, filling unspecified keys with defaults.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| DataError::Config(format!("parse config: {e}")))?;
        let defaults = Self::default();
        let config = Self {
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            api_key: file.api_key.map(SecretString::from),
            base_url: file.base_url.unwrap_or(defaults.base_url),
            max_concurrency: file.max_concurrency.unwrap_or(defaults.max_concurrency),
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            max_retries: file.max_retries.unwrap_or(defaults.max_retries),
            significant_gap_days: file
                .significant_gap_days
                .unwrap_or(defaults.significant_gap_days),
            backfill_min_gap_days: file
                .backfill_min_gap_days
                .unwrap_or(defaults.backfill_min_gap_days),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// File (if given) then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, DataError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `BARVAULT_*` overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(SecretString::from(key));
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    fn validate(&self) -> Result<(), DataError> {
        if self.max_concurrency == 0 {
            return Err(DataError::Config("max_concurrency must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(DataError::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(DataError::Config(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}"
            )));
        }
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("registry.json")
    }
}
