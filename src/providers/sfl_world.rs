use crate::core::cache::TtlCache;
use crate::core::error::{DataUnavailable, FetchError};
use crate::core::market::{ExchangeTable, Fetcher, MarketData, MarketStatus, PriceTable};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Coerces a JSON number or numeric string to a decimal through its text form.
fn to_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Parses `{ "data": { "p2p": { <item>: <price>, ... } } }`.
pub fn parse_prices(url: &str, body: &Value) -> Result<PriceTable, FetchError> {
    let p2p = body
        .get("data")
        .and_then(|data| data.get("p2p"))
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::protocol(url, "missing data.p2p price section"))?;

    let entries = p2p
        .iter()
        .map(|(item, value)| {
            to_decimal(value)
                .map(|price| (item.as_str(), price))
                .ok_or_else(|| FetchError::protocol(url, format!("invalid price for {item}: {value}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PriceTable::from_entries(entries))
}

/// Parses `{ <currency>: { <target>: <rate>, ... }, ... }`.
pub fn parse_exchange(url: &str, body: &Value) -> Result<ExchangeTable, FetchError> {
    let currencies = body
        .as_object()
        .ok_or_else(|| FetchError::protocol(url, "exchange data is not an object"))?;

    let mut rates = BTreeMap::new();
    for (currency, targets) in currencies {
        let targets = targets.as_object().ok_or_else(|| {
            FetchError::protocol(url, format!("rates for {currency} are not an object"))
        })?;
        let mut parsed = BTreeMap::new();
        for (target, value) in targets {
            let rate = to_decimal(value).ok_or_else(|| {
                FetchError::protocol(url, format!("invalid rate {currency}/{target}: {value}"))
            })?;
            parsed.insert(target.clone(), rate);
        }
        rates.insert(currency.clone(), parsed);
    }

    Ok(ExchangeTable::new(rates))
}

/// Serves the stale entry when a refresh failed, if there is one.
fn fall_back<T>(
    result: Result<Arc<T>, FetchError>,
    cache: &TtlCache<T>,
    dataset: &'static str,
) -> Result<Arc<T>, DataUnavailable> {
    match result {
        Ok(value) => Ok(value),
        Err(source) => match cache.stale() {
            Some(value) => {
                warn!(dataset, error = %source, "Refresh failed, serving stale data");
                Ok(value)
            }
            None => Err(DataUnavailable { dataset, source }),
        },
    }
}

/// Cached price and exchange tables from the sfl.world API.
pub struct MarketStore {
    fetcher: Arc<dyn Fetcher>,
    prices_url: String,
    exchange_url: String,
    prices: TtlCache<PriceTable>,
    rates: TtlCache<ExchangeTable>,
}

impl MarketStore {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        prices_url: &str,
        exchange_url: &str,
        ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            prices_url: prices_url.to_string(),
            exchange_url: exchange_url.to_string(),
            prices: TtlCache::new("prices", ttl),
            rates: TtlCache::new("exchange", ttl),
        }
    }

    #[instrument(name = "GetPrices", skip(self))]
    pub async fn get_prices(&self) -> Result<Arc<PriceTable>, DataUnavailable> {
        let result = self
            .prices
            .get_or_refresh(|| async {
                let body = self.fetcher.fetch(&self.prices_url).await?;
                let table = parse_prices(&self.prices_url, &body)?;
                info!(items = table.len(), "Refreshed prices");
                Ok::<_, FetchError>(table)
            })
            .await;
        fall_back(result, &self.prices, "prices")
    }

    #[instrument(name = "GetExchangeRates", skip(self))]
    pub async fn get_exchange_rates(&self) -> Result<Arc<ExchangeTable>, DataUnavailable> {
        let result = self
            .rates
            .get_or_refresh(|| async {
                let body = self.fetcher.fetch(&self.exchange_url).await?;
                let table = parse_exchange(&self.exchange_url, &body)?;
                info!("Refreshed exchange rates");
                Ok::<_, FetchError>(table)
            })
            .await;
        fall_back(result, &self.rates, "exchange rates")
    }

    pub fn cache_status(&self) -> MarketStatus {
        MarketStatus {
            prices: self.prices.status(),
            exchange: self.rates.status(),
        }
    }
}

#[async_trait]
impl MarketData for MarketStore {
    async fn prices(&self) -> Result<Arc<PriceTable>, DataUnavailable> {
        self.get_prices().await
    }

    async fn exchange_rates(&self) -> Result<Arc<ExchangeTable>, DataUnavailable> {
        self.get_exchange_rates().await
    }

    fn status(&self) -> MarketStatus {
        self.cache_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    /// Replays scripted responses in order and counts calls.
    struct MockFetcher {
        responses: Mutex<VecDeque<Result<Value, FetchError>>>,
        call_count: AtomicUsize,
    }

    impl MockFetcher {
        fn new(responses: Vec<Result<Value, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                call_count: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::transport(url, "no scripted response")))
        }
    }

    fn prices_body(wood: Value) -> Value {
        json!({ "data": { "p2p": { "Wood": wood, "Merino Wool": "0.25", "Iron": 1.5 } } })
    }

    fn store(fetcher: Arc<MockFetcher>) -> MarketStore {
        MarketStore::new(fetcher, "mock://prices", "mock://exchange", TTL)
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_parses_and_lowercases_prices() {
        let fetcher = MockFetcher::new(vec![Ok(prices_body(json!(0.05)))]);
        let store = store(fetcher);

        let prices = store.get_prices().await.unwrap();

        assert_eq!(prices.get("wood"), Some(d("0.05")));
        assert_eq!(prices.get("merino wool"), Some(d("0.25")));
        assert_eq!(prices.get("iron"), Some(d("1.5")));
        assert_eq!(prices.len(), 3);
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_cached() {
        let fetcher = MockFetcher::new(vec![Ok(prices_body(json!(0.05)))]);
        let store = store(Arc::clone(&fetcher));

        let first = store.get_prices().await.unwrap();
        let second = store.get_prices().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_once_after_ttl() {
        let fetcher = MockFetcher::new(vec![
            Ok(prices_body(json!(0.05))),
            Ok(prices_body(json!(0.07))),
        ]);
        let store = store(Arc::clone(&fetcher));

        store.get_prices().await.unwrap();
        tokio::time::advance(TTL).await;
        let refreshed = store.get_prices().await.unwrap();
        store.get_prices().await.unwrap();

        assert_eq!(refreshed.get("wood"), Some(d("0.07")));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_serves_stale_table() {
        let fetcher = MockFetcher::new(vec![
            Ok(prices_body(json!(0.05))),
            Err(FetchError::protocol("mock://prices", "HTTP error 502")),
        ]);
        let store = store(Arc::clone(&fetcher));

        let first = store.get_prices().await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let fallback = store.get_prices().await.unwrap();

        assert!(Arc::ptr_eq(&first, &fallback));
        assert_eq!(fetcher.calls(), 2);
        assert!(!store.cache_status().prices.valid);
    }

    #[tokio::test]
    async fn test_cold_failure_is_data_unavailable() {
        let fetcher = MockFetcher::new(vec![Err(FetchError::transport(
            "mock://prices",
            "connection refused",
        ))]);
        let store = store(fetcher);

        let err = store.get_prices().await.unwrap_err();

        assert_eq!(err.dataset, "prices");
        assert!(matches!(err.source, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_price_fails_refresh() {
        let fetcher = MockFetcher::new(vec![Ok(prices_body(json!("cheap")))]);
        let store = store(fetcher);

        let err = store.get_prices().await.unwrap_err();
        assert!(matches!(err.source, FetchError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_missing_p2p_section_fails_refresh() {
        let fetcher = MockFetcher::new(vec![Ok(json!({ "data": {} }))]);
        let store = store(fetcher);

        assert!(store.get_prices().await.is_err());
    }

    #[tokio::test]
    async fn test_exchange_rates_parse_two_levels() {
        let fetcher = MockFetcher::new(vec![Ok(json!({
            "sfl": { "usd": 0.0042, "matic": "0.01" },
            "coins": { "sfl": 320 }
        }))]);
        let store = store(Arc::clone(&fetcher));

        let rates = store.get_exchange_rates().await.unwrap();

        assert_eq!(rates.rate("sfl", "usd"), Some(d("0.0042")));
        assert_eq!(rates.rate("sfl", "matic"), Some(d("0.01")));
        assert_eq!(rates.rate("coins", "sfl"), Some(d("320")));
        assert!(store.cache_status().exchange.valid);
        assert!(!store.cache_status().prices.valid);
    }

    #[test]
    fn test_decimal_coercion_keeps_text_precision() {
        assert_eq!(to_decimal(&json!(0.1)), Some(d("0.1")));
        assert_eq!(to_decimal(&json!("0.00012345")), Some(d("0.00012345")));
        assert_eq!(to_decimal(&json!(7)), Some(d("7")));
        assert_eq!(to_decimal(&json!(1e-7)), Some(d("0.0000001")));
        assert_eq!(to_decimal(&json!(null)), None);
        assert_eq!(to_decimal(&json!("n/a")), None);
    }

    #[test]
    fn test_long_numbers_are_not_rounded_through_floats() {
        let body: Value = serde_json::from_str(
            r#"{"data":{"p2p":{"Wood":0.12345678901234567891,"Iron":"0.12345678901234567891"}}}"#,
        )
        .unwrap();

        let table = parse_prices("prices", &body).unwrap();

        assert_eq!(table.get("wood"), Some(d("0.12345678901234567891")));
        assert_eq!(table.get("wood"), table.get("iron"));
    }
}
