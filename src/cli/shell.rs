use super::ui;
use crate::core::Service;
use crate::core::calc::ResourceKind;
use crate::{AppCommand, execute};
use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error};

/// Market commands, available both as CLI subcommands and as shell lines.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum QueryCommand {
    /// List available items
    Items,
    /// Unit price of an item, or its value after commission: `price merino wool 5`
    Price {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Convert SFL to USD
    Usd { amount: Decimal },
    /// Convert USD to SFL
    Sfl { amount: Decimal },
    /// Oil production cost
    Oil {
        #[arg(default_value = "leather")]
        resource: ResourceKind,
    },
    /// Lava Pit seasonal production costs
    LavaPit {
        #[arg(default_value = "leather")]
        resource: ResourceKind,
    },
    /// Show cache status and usage
    Status,
}

impl From<QueryCommand> for AppCommand {
    fn from(cmd: QueryCommand) -> AppCommand {
        match cmd {
            QueryCommand::Items => AppCommand::Items,
            QueryCommand::Price { query } => AppCommand::Price(query),
            QueryCommand::Usd { amount } => AppCommand::Usd(amount),
            QueryCommand::Sfl { amount } => AppCommand::Sfl(amount),
            QueryCommand::Oil { resource } => AppCommand::Oil(resource),
            QueryCommand::LavaPit { resource } => AppCommand::LavaPit(resource),
            QueryCommand::Status => AppCommand::Status,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sflcalc", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: QueryCommand,
}

fn parse_line(line: &str) -> Result<AppCommand, clap::Error> {
    ShellLine::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command.into())
}

/// Reads one command per line and runs each against the same `service`,
/// so cached tables and usage counters persist between commands.
///
/// Stops at end of input or on `exit` / `quit`. A failing command is reported
/// and the loop carries on.
pub async fn run<R>(service: &Service, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!(
        "{}",
        ui::style_text("Type a command, `help` or `exit`.", ui::StyleType::Subtle)
    );

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let command = match parse_line(line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        debug!(?command, "Shell command");
        if let Err(e) = execute(service, command).await {
            error!(error = %e, "Command failed");
            println!("{}", ui::style_text(&format!("{e:#}"), ui::StyleType::Error));
        }
    }
    Ok(())
}
