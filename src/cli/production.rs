use super::ui;
use crate::core::calc::{
    DRILL_RUNS, LavaPitCosts, LineSource, OIL_PER_BATCH, ProductionCost, ResourceKind,
};
use crate::core::{Service, format_decimal};
use anyhow::Result;
use comfy_table::Cell;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_oil(cost: &ProductionCost) -> String {
    let mut inputs = ui::new_styled_table();
    inputs.set_header(vec![
        ui::header_cell("Input"),
        ui::header_cell("Quantity"),
        ui::header_cell("Unit price"),
        ui::header_cell("Cost (SFL)"),
    ]);
    for input in &cost.inputs {
        inputs.add_row(vec![
            Cell::new(capitalize(input.item)),
            Cell::new(input.quantity),
            ui::amount_cell(input.unit_price),
            ui::amount_cell(input.cost),
        ]);
    }

    let mut scaled = ui::new_styled_table();
    scaled.set_header(vec![ui::header_cell("Oil"), ui::header_cell("Cost (SFL)")]);
    for (units, value) in cost.scaled_costs() {
        scaled.add_row(vec![Cell::new(units), ui::amount_cell(value)]);
    }

    format!(
        "Oil production ({}): {}\n\n{inputs}\n\n{}: {}\n\n{scaled}",
        cost.resource,
        ui::style_text(
            &format!("{DRILL_RUNS} drills → {OIL_PER_BATCH} oil"),
            ui::StyleType::Subtle
        ),
        ui::style_text("Total cost", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{} SFL", format_decimal(cost.total_cost)),
            ui::StyleType::TotalValue
        ),
    )
}

pub fn render_lava_pit(costs: &LavaPitCosts) -> String {
    let mut output = format!(
        "{} (oil at production cost with {}: {} SFL)\n",
        ui::style_text("Lava Pit", ui::StyleType::Title),
        costs.resource,
        format_decimal(costs.oil_unit_cost)
    );

    for season in &costs.seasons {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Ingredient"),
            ui::header_cell("Quantity"),
            ui::header_cell("Cost (SFL)"),
        ]);
        for line in &season.lines {
            let name = match line.source {
                LineSource::ProductionCost => format!("{} (production cost)", capitalize(&line.item)),
                _ => capitalize(&line.item),
            };
            let cost = match line.cost {
                Some(value) => ui::amount_cell(value),
                None => ui::not_found_cell(),
            };
            table.add_row(vec![Cell::new(name), Cell::new(line.quantity), cost]);
        }
        table.add_row(vec![
            Cell::new("Total"),
            Cell::new(""),
            ui::total_cell(season.total),
        ]);

        output.push_str(&format!(
            "\n{}\n{table}\n",
            ui::style_text(&capitalize(&season.season.to_string()), ui::StyleType::TotalLabel)
        ));
        let missing: Vec<&str> = season.missing().map(|l| l.item.as_str()).collect();
        if !missing.is_empty() {
            output.push_str(&format!(
                "{}\n",
                ui::style_text(
                    &format!("Not found, excluded from total: {}", missing.join(", ")),
                    ui::StyleType::Error
                )
            ));
        }
    }

    output.push_str(&format!(
        "\n{}: {}",
        ui::style_text("Grand total", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{} SFL", format_decimal(costs.grand_total)),
            ui::StyleType::TotalValue
        )
    ));
    output
}

pub async fn run_oil(service: &Service, resource: ResourceKind) -> Result<()> {
    let spinner = ui::new_spinner("Fetching prices...");
    let cost = service.oil_cost(resource).await;
    spinner.finish_and_clear();

    println!("{}", render_oil(&cost?));
    Ok(())
}

pub async fn run_lava_pit(service: &Service, resource: ResourceKind) -> Result<()> {
    let spinner = ui::new_spinner("Fetching prices...");
    let costs = service.lava_pit_costs(resource).await;
    spinner.finish_and_clear();

    let (oil, costs) = costs?;
    println!("{}", render_oil(&oil));
    ui::print_separator();
    println!("{}", render_lava_pit(&costs));
    Ok(())
}
