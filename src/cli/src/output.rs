//! Output formatting utilities for the Paricha CLI.
//!
//! Supports table, JSON, and YAML output formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Render as a formatted table
    #[default]
    Table,
    /// Render as JSON
    Json,
    /// Render as YAML
    Yaml,
}

/// Print a success message to stdout.
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// Print a denial to stdout.
pub fn print_denied(msg: &str) {
    println!("{} {}", "[DENIED]".yellow().bold(), msg);
}

/// Print a list of items in the requested format.
///
/// For table output, items must implement `Tabled`. For JSON/YAML, items must
/// implement `Serialize`.
pub fn print_list<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No results found.".dimmed());
                return Ok(());
            }
            let table = Table::new(items)
                .with(Style::rounded())
                .with(Modify::new(Columns::first()).with(Alignment::left()))
                .to_string();
            println!("{}", table);
        }
        OutputFormat::Json | OutputFormat::Yaml => print_item(items, format)?,
    }
    Ok(())
}

/// Print a single item as JSON or YAML. Table output falls back to JSON.
pub fn print_item<T: Serialize + ?Sized>(item: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(item)?);
        }
    }
    Ok(())
}

/// Print key-value details to the terminal (non-JSON/YAML output).
pub fn print_detail(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Print a section header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bold().underline());
    println!();
}
