//! Domain types for BarVault

pub mod bar;
pub mod metadata;
pub mod range;
pub mod summary;

pub use bar::{is_strictly_ascending, Bar};
pub use metadata::{SplitEvent, TickerMetadata};
pub use range::DateRange;
pub use summary::TickerSummary;

/// Symbol type alias
pub type Symbol = String;

/// Canonical form of a ticker symbol: trimmed, upper-case.
pub fn normalize_symbol(symbol: &str) -> Symbol {
    symbol.trim().to_ascii_uppercase()
}
