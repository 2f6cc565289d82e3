//! BarVault Core — daily price history acquisition and storage.
//!
//! This crate contains everything below the CLI:
//! - Domain types (bars, summaries, metadata, date ranges)
//! - Trading-calendar gap detection and the series merge engine
//! - The update planner that turns stored state into a fetch decision
//! - The per-symbol Parquet store and the ticker registry
//! - The Tiingo price source with retries and a circuit breaker

pub mod config;
pub mod data;
pub mod domain;
pub mod planner;
pub mod series;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared with worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TickerSummary>();
        require_sync::<domain::TickerSummary>();
        require_send::<domain::TickerMetadata>();
        require_sync::<domain::TickerMetadata>();

        require_send::<planner::FetchPlan>();
        require_sync::<planner::FetchPlan>();

        require_send::<data::TickerStore>();
        require_sync::<data::TickerStore>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::TiingoSource>();
        require_sync::<data::TiingoSource>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();

        require_send::<config::AppConfig>();
        require_sync::<config::AppConfig>();
    }
}
