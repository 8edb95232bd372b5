//! Table command: show the compiled rule table of one role.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use super::AclSource;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct TableArgs {
    /// Role whose effective rules to show
    role: String,
}

#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Conditional")]
    conditional: bool,
}

pub async fn execute(args: TableArgs, source: &AclSource, format: OutputFormat) -> Result<()> {
    let (_, checker) = source.load_checker()?;
    let Some(table) = checker.acl().table(&args.role) else {
        bail!("Unknown role: {}", args.role);
    };

    let mut rows: Vec<RuleRow> = table
        .iter()
        .map(|(action, rule)| RuleRow {
            action: action.to_string(),
            conditional: rule.is_conditional(),
        })
        .collect();
    rows.sort_by(|a, b| a.action.cmp(&b.action));

    if format == OutputFormat::Table {
        let parent = checker
            .acl()
            .parent_of(&args.role)
            .map_or("-".to_string(), |p| p.to_string());
        output::print_header(&format!("Role {}", args.role));
        output::print_detail("Parent", &parent);
        println!();
    }
    output::print_list(&rows, format)
}
