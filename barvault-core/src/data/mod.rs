//! Data acquisition and persistence

pub mod circuit_breaker;
pub mod ingest;
pub mod provider;
pub mod registry;
pub mod store;
pub mod tiingo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use ingest::{fill_pct_change, ingest, IngestResult};
pub use provider::{DataError, PriceSource, RawBar};
pub use registry::TickerRegistry;
pub use store::TickerStore;
pub use tiingo::TiingoSource;
