use super::ui;
use crate::core::Service;
use crate::core::cache::CacheStatus;
use crate::core::service::ServiceStatus;
use comfy_table::Cell;

fn validity_cell(status: &CacheStatus) -> Cell {
    if status.valid {
        Cell::new("Valid").fg(comfy_table::Color::Green)
    } else {
        Cell::new("Expired").fg(comfy_table::Color::Red)
    }
}

pub fn render(status: &ServiceStatus) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Cache"),
        ui::header_cell("State"),
        ui::header_cell("TTL (s)"),
    ]);
    for (name, cache) in [
        ("Prices", &status.market.prices),
        ("Exchange", &status.market.exchange),
    ] {
        table.add_row(vec![
            Cell::new(name),
            validity_cell(cache),
            Cell::new(cache.ttl_remaining_secs),
        ]);
    }

    format!(
        "{}\n\n{table}\n\nRequests: {}\nUsers today ({}): {}",
        ui::style_text("System status", ui::StyleType::Title),
        status.usage.total_requests,
        status.usage.day,
        status.usage.daily_users
    )
}

pub fn run(service: &Service) -> anyhow::Result<()> {
    println!("{}", render(&service.status()));
    Ok(())
}
