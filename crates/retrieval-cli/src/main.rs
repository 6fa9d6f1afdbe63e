//! Operator CLI: read-only inspection of configurations, executions, and
//! discovered/processed files, plus a manual trigger that runs one
//! configuration's file-check outside the worker process.

mod commands;
mod output;
mod secrets;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::configurations::ConfigurationsCommand;
use commands::discovered_files::DiscoveredFilesCommand;
use commands::executions::ExecutionsCommand;
use commands::processed_files::ProcessedFilesCommand;
use commands::trigger::TriggerCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "retrieval-cli", version, about = "Operator CLI for the retrieval service")]
struct Cli {
    /// Path to the worker's SQLite database
    #[arg(long, global = true, default_value = "retrieval-worker.sqlite3")]
    db: PathBuf,

    /// Emit machine-readable JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List configurations for a client
    Configurations(ConfigurationsCommand),
    /// List recent executions for a configuration
    Executions(ExecutionsCommand),
    /// List files discovered by past executions
    DiscoveredFiles(DiscoveredFilesCommand),
    /// List downloaded and checksummed files
    ProcessedFiles(ProcessedFilesCommand),
    /// Run one configuration's file-check immediately
    Trigger(TriggerCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };

    let result = match &cli.command {
        Command::Configurations(cmd) => cmd.execute(&cli.db, format).await,
        Command::Executions(cmd) => cmd.execute(&cli.db, format).await,
        Command::DiscoveredFiles(cmd) => cmd.execute(&cli.db, format).await,
        Command::ProcessedFiles(cmd) => cmd.execute(&cli.db, format).await,
        Command::Trigger(cmd) => cmd.execute(&cli.db, format).await,
    };

    if let Err(err) = &result {
        let formatter = output::get_formatter(cli.json);
        formatter.error(&format!("{err:#}"));
    }

    result
}
