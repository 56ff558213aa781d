use crate::core::calc::DEFAULT_MARKET_FEE;
use crate::providers::util::RetryPolicy;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG: &str = r#"---
providers:
  sfl_world:
    prices_url: "https://sfl.world/api/v1/prices"
    exchange_url: "https://sfl.world/api/v1/exchange"

request_timeout_secs: 5
cache_ttl_secs: 300
market_fee: "0.10"

retry:
  max_attempts: 3
  base_delay_ms: 1000
  max_delay_ms: 8000
"#;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SflWorldConfig {
    pub prices_url: String,
    pub exchange_url: String,
}

impl Default for SflWorldConfig {
    fn default() -> Self {
        SflWorldConfig {
            prices_url: "https://sfl.world/api/v1/prices".to_string(),
            exchange_url: "https://sfl.world/api/v1/exchange".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub sfl_world: SflWorldConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

fn default_request_timeout() -> u64 {
    5
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_market_fee() -> Decimal {
    DEFAULT_MARKET_FEE
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_market_fee")]
    pub market_fee: Decimal,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            request_timeout_secs: default_request_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            market_fee: default_market_fee(),
            retry: RetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file exists. `CACHE_TTL` and `MARKET_FEE` override the file.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let mut config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("world", "sfl", "sflcalc")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut config = Self::read_file(path.as_ref())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &std::path::Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(ttl) = lookup("CACHE_TTL") {
            self.cache_ttl_secs = ttl
                .trim()
                .parse()
                .with_context(|| format!("Invalid CACHE_TTL: {ttl}"))?;
            debug!(cache_ttl_secs = self.cache_ttl_secs, "CACHE_TTL override");
        }
        if let Some(fee) = lookup("MARKET_FEE") {
            self.market_fee = fee
                .trim()
                .parse()
                .with_context(|| format!("Invalid MARKET_FEE: {fee}"))?;
            debug!(market_fee = %self.market_fee, "MARKET_FEE override");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.market_fee < Decimal::ZERO || self.market_fee > Decimal::ONE {
            bail!("market_fee must be between 0 and 1, got {}", self.market_fee);
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
