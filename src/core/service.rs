//! Long-lived entry point tying market data, calculations and usage counters

use crate::core::calc::{
    self, CurrencyConversion, ItemQuote, LavaPitCosts, ProductionCost, ResourceKind,
};
use crate::core::error::CalcError;
use crate::core::market::{MarketData, MarketStatus};
use crate::core::usage::{UsageSnapshot, UsageStats};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub market: MarketStatus,
    pub usage: UsageSnapshot,
}

pub struct Service {
    market: Arc<dyn MarketData>,
    market_fee: Decimal,
    usage: UsageStats,
}

impl Service {
    pub fn new(market: Arc<dyn MarketData>, market_fee: Decimal) -> Self {
        Self {
            market,
            market_fee,
            usage: UsageStats::new(),
        }
    }

    pub fn market_fee(&self) -> Decimal {
        self.market_fee
    }

    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }

    /// Available item names, sorted.
    pub async fn items(&self) -> Result<Vec<String>, CalcError> {
        let prices = self.market.prices().await?;
        Ok(prices.items().map(str::to_string).collect())
    }

    /// Unit price of an item, or the market conversion of `amount` units.
    pub async fn quote_item(
        &self,
        name: &str,
        amount: Option<Decimal>,
    ) -> Result<ItemQuote, CalcError> {
        let (prices, rates) =
            futures::try_join!(self.market.prices(), self.market.exchange_rates())?;
        debug!(item = name, ?amount, "Quoting item");
        calc::quote_item(&prices, &rates, name, amount, self.market_fee)
    }

    pub async fn sfl_to_usd(&self, amount: Decimal) -> Result<CurrencyConversion, CalcError> {
        let rates = self.market.exchange_rates().await?;
        calc::sfl_to_usd(&rates, amount)
    }

    pub async fn usd_to_sfl(&self, amount: Decimal) -> Result<CurrencyConversion, CalcError> {
        let rates = self.market.exchange_rates().await?;
        calc::usd_to_sfl(&rates, amount)
    }

    pub async fn oil_cost(&self, resource: ResourceKind) -> Result<ProductionCost, CalcError> {
        let prices = self.market.prices().await?;
        calc::oil_production_cost(&prices, resource)
    }

    /// Seasonal Lava Pit costs, with oil priced at its production cost.
    pub async fn lava_pit_costs(
        &self,
        resource: ResourceKind,
    ) -> Result<(ProductionCost, LavaPitCosts), CalcError> {
        let prices = self.market.prices().await?;
        let oil = calc::oil_production_cost(&prices, resource)?;
        let seasons = calc::lava_pit_costs(&prices, resource, oil.unit_cost)?;
        Ok((oil, seasons))
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            market: self.market.status(),
            usage: self.usage.snapshot(),
        }
    }
}
