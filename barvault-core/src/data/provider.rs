//! Price source trait and structured error types.
//!
//! The PriceSource trait abstracts over the upstream price API so the update
//! path can be exercised against an in-memory source in tests.

use crate::domain::{SplitEvent, TickerMetadata};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily bar as delivered by a price source (before ingest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adj_open: f64,
    pub adj_high: f64,
    pub adj_low: f64,
    pub adj_close: f64,
    pub adj_volume: u64,
}

/// Structured error types for data operations.
///
/// These are designed to be displayable per symbol in batch reports.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider server error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("stored series for '{symbol}' is unreadable: {reason}")]
    StorageCorruption { symbol: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Failures that may succeed if the same request is issued later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::Timeout(_)
                | DataError::RateLimited { .. }
                | DataError::ServerError { .. }
                | DataError::CircuitBreakerTripped
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::SymbolNotFound { .. })
    }
}

/// Trait for upstream price sources.
///
/// Implementations handle the specifics of one API. The store sits above
/// this trait — sources don't know about persistence. An empty `Vec` from
/// `fetch_daily` means "no rows in range" and is not an error.
pub trait PriceSource: Send + Sync {
    /// Short tag stored on every bar fetched from this source.
    fn name(&self) -> &str;

    /// Fetch daily bars. `None` bounds mean "earliest available" / "latest available".
    fn fetch_daily(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<RawBar>, DataError>;

    /// Split events dated within `[start, end]`. `None` bounds are open, as in `fetch_daily`.
    fn fetch_split_events(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<SplitEvent>, DataError>;

    /// Company metadata for registry enrollment.
    fn fetch_metadata(&self, symbol: &str) -> Result<TickerMetadata, DataError>;

    /// Check if the source is currently accepting requests.
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(DataError::Timeout("30s".into()).is_transient());
        assert!(DataError::ServerError { status: 503 }.is_transient());
        assert!(DataError::CircuitBreakerTripped.is_transient());
        assert!(!DataError::SymbolNotFound { symbol: "ZZZZ".into() }.is_transient());
        assert!(DataError::SymbolNotFound { symbol: "ZZZZ".into() }.is_not_found());
        assert!(!DataError::StorageCorruption {
            symbol: "SPY".into(),
            reason: "bad magic".into()
        }
        .is_transient());
    }
}
