use super::ui;
use crate::core::calc::CurrencyConversion;
use crate::core::{Service, format_decimal};
use anyhow::Result;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SflToUsd,
    UsdToSfl,
}

pub fn render(direction: Direction, conversion: &CurrencyConversion) -> String {
    let amount = format_decimal(conversion.amount);
    let value = format_decimal(conversion.value);
    let headline = match direction {
        Direction::SflToUsd => format!("{amount} SFL ≈ ${value} USD"),
        Direction::UsdToSfl => format!("${amount} USD ≈ {value} SFL"),
    };
    format!(
        "{}\n{}",
        ui::style_text(&headline, ui::StyleType::TotalValue),
        ui::style_text(
            &format!("Current rate: 1 SFL ≈ ${}", format_decimal(conversion.rate)),
            ui::StyleType::Subtle
        )
    )
}

pub async fn run(service: &Service, direction: Direction, amount: Decimal) -> Result<()> {
    let spinner = ui::new_spinner("Fetching exchange rates...");
    let conversion = match direction {
        Direction::SflToUsd => service.sfl_to_usd(amount).await,
        Direction::UsdToSfl => service.usd_to_sfl(amount).await,
    };
    spinner.finish_and_clear();

    println!("{}", render(direction, &conversion?));
    Ok(())
}
