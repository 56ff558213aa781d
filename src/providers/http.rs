use super::util::{RetryPolicy, with_retry};
use crate::core::error::FetchError;
use crate::core::market::Fetcher;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// JSON-over-HTTP fetcher with a per-attempt timeout and retries.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sflcalc/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, retry })
    }

    async fn fetch_once(&self, url: &str) -> Result<Value, FetchError> {
        debug!("Requesting {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::transport(url, format!("request timed out: {e}"))
            } else {
                FetchError::transport(url, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::protocol(url, format!("HTTP error {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::transport(url, format!("failed to read body: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            error!(
                error = ?e,
                response = %text,
                "Failed to parse response"
            );
            FetchError::protocol(url, format!("JSON parsing error: {e}"))
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(name = "HttpFetch", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        with_retry(|| self.fetch_once(url), &self.retry).await
    }
}
