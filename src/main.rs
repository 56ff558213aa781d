use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use sflcalc::cli::shell::QueryCommand;
use sflcalc::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Read commands from stdin, keeping caches and usage counters between them
    Shell,
    #[command(flatten)]
    Query(QueryCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => sflcalc::cli::setup::setup(),
        Some(Commands::Shell) => sflcalc::run_shell(cli.config_path.as_deref()).await,
        Some(Commands::Query(cmd)) => {
            sflcalc::run_command(cmd.into(), cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
