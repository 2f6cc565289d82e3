//! Tiingo end-of-day price source.
//!
//! Fetches daily raw and adjusted OHLCV bars, split events and listing metadata
//! from Tiingo's REST API using a static API key. Handles retries with
//! exponential backoff for transient failures and shares a circuit breaker
//! across all workers.
//!
//! Split factors arrive on every price row, so the split lookup that follows
//! a price fetch is answered from that response without another request.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, PriceSource, RawBar};
use crate::config::AppConfig;
use crate::domain::{DateRange, SplitEvent, TickerMetadata};
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Lower bound sent when the caller asks for "all available history".
/// Tiingo returns only the latest bar when no start date is given.
const EARLIEST_START: &str = "1900-01-01";

/// Ceiling for a single retry sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// One row of the `/tiingo/daily/{ticker}/prices` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceRow {
    date: DateTime<Utc>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    adj_open: Option<f64>,
    adj_high: Option<f64>,
    adj_low: Option<f64>,
    adj_close: Option<f64>,
    adj_volume: Option<f64>,
    #[serde(default)]
    split_factor: Option<f64>,
}

/// `/tiingo/daily/{ticker}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaResponse {
    ticker: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exchange_code: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

/// Split events from the last price response for a symbol and the dates it spanned.
#[derive(Debug, Clone)]
struct SplitWindow {
    first: NaiveDate,
    last: NaiveDate,
    events: Vec<SplitEvent>,
}

impl SplitWindow {
    fn from_rows(rows: &[PriceRow]) -> Option<Self> {
        let first = rows.iter().map(|r| r.date.date_naive()).min()?;
        let last = rows.iter().map(|r| r.date.date_naive()).max()?;
        Some(Self {
            first,
            last,
            events: rows_to_splits(rows),
        })
    }

    fn covers(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
        start.is_some_and(|s| s >= self.first) && end.is_some_and(|e| e <= self.last)
    }
}

pub struct TiingoSource {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: SecretString,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
    recent_splits: Mutex<HashMap<String, SplitWindow>>,
}

impl TiingoSource {
    pub fn new(
        config: &AppConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let api_key = config.api_key.as_ref().ok_or_else(|| {
            DataError::Config(format!(
                "no API key configured (set `api_key` in the config file or {})",
                crate::config::ENV_API_KEY
            ))
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.expose_secret().to_string()),
            circuit_breaker,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(500),
            recent_splits: Mutex::new(HashMap::new()),
        })
    }

    fn prices_url(&self, symbol: &str) -> String {
        format!("{}/tiingo/daily/{}/prices", self.base_url, symbol.to_ascii_lowercase())
    }

    fn meta_url(&self, symbol: &str) -> String {
        format!("{}/tiingo/daily/{}", self.base_url, symbol.to_ascii_lowercase())
    }

    fn price_query(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("format", "json".to_string()),
            ("resampleFreq", "daily".to_string()),
            (
                "startDate",
                start.map_or_else(|| EARLIEST_START.to_string(), |d| d.to_string()),
            ),
        ];
        if let Some(end) = end {
            query.push(("endDate", end.to_string()));
        }
        query
    }

    fn fetch_rows(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRow>, DataError> {
        self.get_json(symbol, &self.prices_url(symbol), &Self::price_query(start, end))
    }

    fn remember_splits(&self, symbol: &str, rows: &[PriceRow]) {
        let Some(window) = SplitWindow::from_rows(rows) else {
            return;
        };
        if let Ok(mut cache) = self.recent_splits.lock() {
            cache.insert(symbol.to_ascii_uppercase(), window);
        }
    }

    /// Events for `[start, end]` if the last price response for `symbol` spanned it.
    /// A hit consumes the entry.
    fn cached_splits(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Option<Vec<SplitEvent>> {
        let mut cache = self.recent_splits.lock().ok()?;
        let key = symbol.to_ascii_uppercase();
        if !cache.get(&key)?.covers(start, end) {
            return None;
        }
        let window = cache.remove(&key)?;
        let range = DateRange::new(start, end);
        Some(window.events.into_iter().filter(|e| range.contains(e.date)).collect())
    }

    /// GET with retry and circuit breaker logic. The key travels in the
    /// `Authorization` header so it never shows up in URLs or error text.
    fn get_json<T: DeserializeOwned>(
        &self,
        symbol: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                debug!(symbol, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let sent = self
                .client
                .get(url)
                .query(query)
                .header(
                    reqwest::header::AUTHORIZATION,
                    format!("Token {}", self.api_key.expose_secret()),
                )
                .send();

            let resp = match sent {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() => {
                    last_error = Some(DataError::Timeout(e.without_url().to_string()));
                    continue;
                }
                Err(e) if e.is_connect() => {
                    last_error = Some(DataError::NetworkUnreachable(e.without_url().to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.without_url().to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "API key rejected by provider".into(),
                ));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                self.circuit_breaker.record_success();
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }
            if status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::ServerError {
                    status: status.as_u16(),
                });
                continue;
            }
            if !status.is_success() {
                return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
            }

            let parsed = resp.json::<T>().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {}",
                    e.without_url()
                ))
            })?;
            self.circuit_breaker.record_success();
            return Ok(parsed);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Sleep before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// Convert price rows into raw bars, dropping rows with no prices at all.
fn rows_to_bars(rows: Vec<PriceRow>) -> Vec<RawBar> {
    rows.into_iter()
        .filter(|r| r.open.is_some() || r.high.is_some() || r.low.is_some() || r.close.is_some())
        .map(|r| {
            let open = r.open.unwrap_or(f64::NAN);
            let high = r.high.unwrap_or(f64::NAN);
            let low = r.low.unwrap_or(f64::NAN);
            let close = r.close.unwrap_or(f64::NAN);
            let volume = volume_from(r.volume);
            RawBar {
                date: r.date.date_naive(),
                open,
                high,
                low,
                close,
                volume,
                adj_open: r.adj_open.unwrap_or(open),
                adj_high: r.adj_high.unwrap_or(high),
                adj_low: r.adj_low.unwrap_or(low),
                adj_close: r.adj_close.unwrap_or(close),
                adj_volume: r.adj_volume.map_or(volume, |v| volume_from(Some(v))),
            }
        })
        .collect()
}

fn volume_from(v: Option<f64>) -> u64 {
    v.filter(|v| v.is_finite() && *v > 0.0)
        .map_or(0, |v| v.round() as u64)
}

/// Rows whose split factor differs from 1 mark a split on that date.
fn rows_to_splits(rows: &[PriceRow]) -> Vec<SplitEvent> {
    rows.iter()
        .filter_map(|r| {
            let ratio = r.split_factor?;
            ((ratio - 1.0).abs() > f64::EPSILON && ratio > 0.0).then(|| SplitEvent {
                date: r.date.date_naive(),
                ratio,
            })
        })
        .collect()
}

fn parse_meta_date(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.get(..10)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn meta_to_metadata(meta: MetaResponse) -> TickerMetadata {
    TickerMetadata {
        symbol: meta.ticker.to_ascii_uppercase(),
        name: meta.name.unwrap_or_default(),
        exchange: meta.exchange_code.unwrap_or_default(),
        sector: None,
        description: meta.description.filter(|d| !d.trim().is_empty()),
        listed_from: parse_meta_date(meta.start_date.as_deref()),
        listed_until: parse_meta_date(meta.end_date.as_deref()),
        registered_at: None,
    }
}

impl PriceSource for TiingoSource {
    fn name(&self) -> &str {
        "tiingo"
    }

    fn fetch_daily(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawBar>, DataError> {
        let rows = self.fetch_rows(symbol, start, end)?;
        debug!(symbol, rows = rows.len(), "fetched daily rows");
        self.remember_splits(symbol, &rows);
        Ok(rows_to_bars(rows))
    }

    fn fetch_split_events(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<SplitEvent>, DataError> {
        if let Some(events) = self.cached_splits(symbol, start, end) {
            debug!(symbol, events = events.len(), "split events from last price response");
            return Ok(events);
        }
        let rows = self.fetch_rows(symbol, start, end)?;
        Ok(rows_to_splits(&rows))
    }

    fn fetch_metadata(&self, symbol: &str) -> Result<TickerMetadata, DataError> {
        let meta: MetaResponse = self.get_json(symbol, &self.meta_url(symbol), &[])?;
        Ok(meta_to_metadata(meta))
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
