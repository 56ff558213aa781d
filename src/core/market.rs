//! Market data abstractions and core types

use crate::core::cache::CacheStatus;
use crate::core::error::{DataUnavailable, FetchError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Smallest amount accepted by any conversion.
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

pub fn validate_amount(amount: Decimal) -> bool {
    amount >= MIN_AMOUNT
}

/// Key used for item matching: lower-cased with all whitespace removed.
pub fn normalize_item_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Unit prices keyed by lower-cased item name.
///
/// Entries are taken in the order they are supplied. When two source names
/// collapse to the same key, the first one wins and the collision is logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: BTreeMap<String, Decimal>,
    normalized: HashMap<String, String>,
}

impl PriceTable {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for (name, price) in entries {
            let key = name.as_ref().to_lowercase();
            if table.prices.contains_key(&key) {
                warn!(item = %name.as_ref(), "Duplicate item name in price data, keeping first");
                continue;
            }
            let normalized = normalize_item_name(&key);
            match table.normalized.get(&normalized) {
                Some(existing) => {
                    warn!(
                        item = %key,
                        existing = %existing,
                        "Item name collides with another after normalization, keeping first"
                    );
                }
                None => {
                    table.normalized.insert(normalized, key.clone());
                }
            }
            table.prices.insert(key, price);
        }
        table
    }

    /// Exact lookup by lower-cased key.
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.prices.get(key).copied()
    }

    /// Case- and whitespace-insensitive lookup, returning the table key too.
    pub fn find(&self, name: &str) -> Option<(&str, Decimal)> {
        let key = self.normalized.get(&normalize_item_name(name))?;
        self.prices
            .get_key_value(key)
            .map(|(k, price)| (k.as_str(), *price))
    }

    /// Item names in sorted order.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Currency -> target currency -> rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeTable {
    rates: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl ExchangeTable {
    pub fn new(rates: BTreeMap<String, BTreeMap<String, Decimal>>) -> Self {
        Self { rates }
    }

    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self.rates.get(from).and_then(|targets| targets.get(to)).copied()
    }
}

/// Freshness of both cached tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStatus {
    pub prices: CacheStatus,
    pub exchange: CacheStatus,
}

/// Performs a GET and decodes the body as JSON.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Source of the cached price and exchange tables.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn prices(&self) -> Result<Arc<PriceTable>, DataUnavailable>;
    async fn exchange_rates(&self) -> Result<Arc<ExchangeTable>, DataUnavailable>;
    fn status(&self) -> MarketStatus;
}
