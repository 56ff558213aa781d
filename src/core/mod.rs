//! Core business logic: cached market data and the calculations built on it

pub mod cache;
pub mod calc;
pub mod config;
pub mod error;
pub mod format;
pub mod log;
pub mod market;
pub mod service;
pub mod usage;

// Re-export main types for cleaner imports
pub use cache::{CacheStatus, TtlCache};
pub use error::{CalcError, DataUnavailable, FetchError};
pub use format::format_decimal;
pub use market::{ExchangeTable, Fetcher, MarketData, MarketStatus, PriceTable};
pub use service::Service;
