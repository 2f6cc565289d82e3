//! Reference data reported by a price source about a listing.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Company metadata for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMetadata {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// First date of history the source reports for this listing.
    #[serde(default)]
    pub listed_from: Option<NaiveDate>,
    #[serde(default)]
    pub listed_until: Option<NaiveDate>,
    #[serde(default)]
    pub registered_at: Option<NaiveDateTime>,
}

/// A split reported by the source: `ratio` new shares per old share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitEvent {
    pub date: NaiveDate,
    pub ratio: f64,
}
