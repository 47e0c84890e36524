//! Exchange-rate resolution
//!
//! Read path for current and historical exchange rates. Lookups go through a
//! [`RateSource`] chain (in-process cache, then SQLite) and are gated by the
//! published fetcher flags.
//!
//! ## Module Organization
//!
//! - `types` - ExchangeRate, HistoryPoint, AssetKind
//! - `source` - RateSource trait, memory cache, fallback chain
//! - `sqlite_store` - SQLite storage of rates and daily history
//! - `resolver` - Flag-gated read operations

pub mod resolver;
pub mod source;
pub mod sqlite_store;
pub mod types;

pub use resolver::ExchangeRateResolver;
pub use source::{ChainedRateSource, MemoryRateStore, RateSource, SourceError};
pub use sqlite_store::SqliteRateStore;
pub use types::{AssetKind, ExchangeRate, HistoryOptions, HistoryPoint};
