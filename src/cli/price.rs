use super::ui;
use crate::core::calc::{BASE_CURRENCY, ItemQuote};
use crate::core::{Service, format_decimal};
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use rust_decimal::Decimal;

pub const MAX_INPUT_LENGTH: usize = 50;

/// Splits `merino wool 5` into the item name and an optional trailing amount.
pub fn parse_item_query(words: &[String]) -> Result<(String, Option<Decimal>)> {
    let input = words.join(" ");
    if input.chars().count() > MAX_INPUT_LENGTH {
        bail!("Input too long. Please shorten your request.");
    }

    match words.split_last() {
        Some((last, rest))
            if !rest.is_empty() && last.chars().all(|c| c.is_ascii_digit() || c == '.') =>
        {
            let amount = last
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount format: {last}"))?;
            Ok((rest.join(" "), Some(amount)))
        }
        Some(_) => Ok((input, None)),
        None => bail!("Missing item name"),
    }
}

fn percent(rate: Decimal) -> String {
    format!("{}%", format_decimal(rate * Decimal::ONE_HUNDRED))
}

pub fn render_quote(quote: &ItemQuote) -> String {
    let sfl = BASE_CURRENCY.to_uppercase();
    match quote {
        ItemQuote::Unit { item, price, quote } => format!(
            "1 {} ≈ {} {sfl} (≈ ${} USD)",
            ui::style_text(item, ui::StyleType::TotalLabel),
            format_decimal(*price),
            format_decimal(*quote)
        ),
        ItemQuote::Amount { item, conversion } => {
            let mut table = ui::new_styled_table();
            table.set_header(vec![ui::header_cell(""), ui::header_cell("Value")]);
            table.add_row(vec![
                Cell::new(format!("{} {item}", format_decimal(conversion.amount))),
                Cell::new(format!("{} {sfl}", format_decimal(conversion.gross_base))),
            ]);
            table.add_row(vec![
                Cell::new("Gross value (USD)"),
                ui::amount_cell(conversion.gross_quote),
            ]);
            table.add_row(vec![
                Cell::new(format!("Commission ({})", percent(conversion.fee_rate))),
                ui::amount_cell(-conversion.fee),
            ]);
            table.add_row(vec![
                Cell::new("Net received (USD)"),
                ui::total_cell(conversion.net_quote),
            ]);

            format!(
                "{}\n\n{table}\n{}",
                ui::style_text(item, ui::StyleType::Title),
                ui::style_text(
                    &format!("1 {sfl} ≈ ${}", format_decimal(conversion.rate)),
                    ui::StyleType::Subtle
                )
            )
        }
    }
}

pub async fn run(service: &Service, words: &[String]) -> Result<()> {
    let (item, amount) = parse_item_query(words)?;

    let spinner = ui::new_spinner("Fetching prices...");
    let quote = service.quote_item(&item, amount).await;
    spinner.finish_and_clear();

    println!("{}", render_quote(&quote?));
    Ok(())
}

pub async fn run_items(service: &Service) -> Result<()> {
    let spinner = ui::new_spinner("Fetching prices...");
    let items = service.items().await;
    spinner.finish_and_clear();

    let items = items?;
    println!(
        "{} ({})\n\n{}",
        ui::style_text("Available items", ui::StyleType::Title),
        items.len(),
        items.join(", ")
    );
    Ok(())
}
