//! Paricha CLI - Command-line interface for Paricha ACL documents.
//!
//! Provides commands to validate a document, list its roles, show a role's
//! compiled table and check a single call against the gate.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{check, roles, table, validate, AclSource};
use output::OutputFormat;
use paricha_core::config::Settings;
use paricha_core::telemetry::{init_logging, LogFormat, LoggingConfig};

/// Paricha - role-based access checks for service methods
#[derive(Parser)]
#[command(
    name = "paricha",
    version = "0.1.0",
    about = "Paricha - role-based access checks for service methods",
    long_about = "CLI tool for validating ACL documents, inspecting compiled role tables and checking calls.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// ACL document (TOML or JSON)
    #[arg(short, long, global = true, env = "PARICHA_ACL_FILE")]
    file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and compile the ACL document
    Validate,

    /// List roles with their parent and rule counts
    Roles,

    /// Show the compiled rule table of a role
    Table(table::TableArgs),

    /// Check whether a call would pass the gate
    Check(check::CheckArgs),
}

fn logging_config(settings: &Settings, verbose: bool) -> LoggingConfig {
    let mut logging = LoggingConfig {
        format: LogFormat::Compact,
        include_target: false,
        ..settings.logging.clone()
    };
    if verbose {
        logging.level = "debug".to_string();
    }
    logging
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;
    init_logging(&logging_config(&settings, cli.verbose))?;

    let source = AclSource::resolve(cli.file, settings)?;
    let format = cli.output;

    match cli.command {
        Commands::Validate => validate::execute(&source, format).await,
        Commands::Roles => roles::execute(&source, format).await,
        Commands::Table(args) => table::execute(args, &source, format).await,
        Commands::Check(args) => check::execute(args, &source, format).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
