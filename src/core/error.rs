//! Error taxonomy shared by the fetcher, the store and the calculation engine

use thiserror::Error;

/// Failure of a single remote fetch, classified by where it broke.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout and friends
    #[error("Connection error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Non-2xx status or a body that is not the JSON we expect
    #[error("Protocol error for {url}: {message}")]
    Protocol { url: String, message: String },
}

impl FetchError {
    pub fn transport(url: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn protocol(url: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Raised by the store when neither a fresh nor a stale table exists.
#[derive(Debug, Clone, Error)]
#[error("{dataset} unavailable: {source}")]
pub struct DataUnavailable {
    pub dataset: &'static str,
    #[source]
    pub source: FetchError,
}

/// Errors of the calculation engine.
#[derive(Debug, Clone, Error)]
pub enum CalcError {
    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    /// A required ingredient price is zero or absent
    #[error("Could not fetch all required resource prices (missing: {})", .missing.join(", "))]
    MissingPriceData { missing: Vec<String> },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid exchange rate {from}/{to}")]
    InvalidRate { from: String, to: String },

    #[error("Item '{0}' not found")]
    ItemNotFound(String),
}
