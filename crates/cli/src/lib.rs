pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "crosscheck",
    about = "Customer API reconciliation harness",
    long_about = "Drive the customer CRUD API through its scenario table and cross-check every \
                  HTTP outcome against the backing store.",
    after_help = "Examples:\n  crosscheck run --workers 8\n  crosscheck run --filter invalid-email --json\n  crosscheck doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a crosscheck.toml file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the scenario table against the service and the store")]
    Run {
        #[arg(long, help = "Emit the run summary as JSON")]
        json: bool,
        #[arg(long, help = "Only run scenarios whose name contains this text")]
        filter: Option<String>,
        #[arg(long, help = "Maximum number of scenarios in flight")]
        workers: Option<usize>,
    },
    #[command(about = "List the scenario table without sending anything")]
    Scenarios,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Check config, service reachability, and store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config;

    let result = match cli.command {
        Command::Run { json, filter, workers } => {
            commands::run::run(commands::run::RunArgs { config_path, json, filter, workers })
        }
        Command::Scenarios => commands::scenarios::run(config_path),
        Command::Config => commands::config::run(config_path),
        Command::Doctor { json } => commands::doctor::run(config_path, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
