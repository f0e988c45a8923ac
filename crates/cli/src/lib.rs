pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use threadloom_core::format::DEFAULT_ROWS_PER_MESSAGE;

#[derive(Debug, Parser)]
#[command(
    name = "threadloom",
    about = "Threadloom operator CLI",
    long_about = "Check Threadloom readiness, inspect configuration, and preview how a research CSV \
                  would be split into channel threads.",
    after_help = "Examples:\n  threadloom doctor --json\n  threadloom config\n  threadloom preview research.csv --uploader @mika"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config and Discord token readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Parse a research CSV and show the threads it would create, offline")]
    Preview {
        #[arg(help = "Path to the CSV file")]
        path: PathBuf,
        #[arg(long, default_value = "@uploader", help = "Name rendered at the top of each row")]
        uploader: String,
        #[arg(long, default_value_t = DEFAULT_ROWS_PER_MESSAGE, help = "Rows per message chunk")]
        rows_per_message: usize,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Preview { path, uploader, rows_per_message, json } => {
            commands::preview::run(&path, &uploader, rows_per_message, json)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
