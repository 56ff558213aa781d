pub mod cli;
pub mod core;
pub mod providers;

use crate::core::calc::ResourceKind;
use crate::core::config::AppConfig;
use crate::core::{MarketData, Service};
use crate::providers::{HttpFetcher, MarketStore};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Items,
    Price(Vec<String>),
    Usd(Decimal),
    Sfl(Decimal),
    Oil(ResourceKind),
    LavaPit(ResourceKind),
    Status,
}

/// Wires the HTTP fetcher, the cached store and the service from `config`.
pub fn build_service(config: &AppConfig) -> Result<Service> {
    let fetcher = HttpFetcher::new(config.request_timeout(), config.retry.policy())
        .context("Failed to build HTTP client")?;
    let endpoints = &config.providers.sfl_world;
    let store: Arc<dyn MarketData> = Arc::new(MarketStore::new(
        Arc::new(fetcher),
        &endpoints.prices_url,
        &endpoints.exchange_url,
        config.cache_ttl(),
    ));
    Ok(Service::new(store, config.market_fee))
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "local".to_string())
}

pub async fn execute(service: &Service, command: AppCommand) -> Result<()> {
    service.usage().record(&current_user());
    match command {
        AppCommand::Items => cli::price::run_items(service).await,
        AppCommand::Price(words) => cli::price::run(service, &words).await,
        AppCommand::Usd(amount) => {
            cli::convert::run(service, cli::convert::Direction::SflToUsd, amount).await
        }
        AppCommand::Sfl(amount) => {
            cli::convert::run(service, cli::convert::Direction::UsdToSfl, amount).await
        }
        AppCommand::Oil(resource) => cli::production::run_oil(service, resource).await,
        AppCommand::LavaPit(resource) => cli::production::run_lava_pit(service, resource).await,
        AppCommand::Status => cli::status::run(service),
    }
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("sflcalc starting...");

    let service = build_service(&load_config(config_path)?)?;
    execute(&service, command).await
}

/// Serves commands from stdin until it closes, sharing one service.
pub async fn run_shell(config_path: Option<&str>) -> Result<()> {
    info!("sflcalc shell starting...");

    let service = build_service(&load_config(config_path)?)?;
    cli::shell::run(&service, BufReader::new(tokio::io::stdin())).await
}
