//! Roles command: list every role with its rule counts.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use super::AclSource;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    #[tabled(rename = "Role")]
    name: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Declared")]
    declared: usize,
    #[tabled(rename = "Effective")]
    effective: usize,
    #[tabled(rename = "Wildcard")]
    wildcard: bool,
}

pub async fn execute(source: &AclSource, format: OutputFormat) -> Result<()> {
    let (document, checker) = source.load_checker()?;
    let acl = checker.acl();

    let rows: Vec<RoleRow> = document
        .roles
        .iter()
        .map(|(name, spec)| {
            let table = acl.table(name);
            RoleRow {
                name: name.clone(),
                parent: spec.parent.clone().unwrap_or_else(|| "-".to_string()),
                declared: spec.allow.len(),
                effective: table.map_or(0, |t| t.len()),
                wildcard: table.is_some_and(|t| t.has_wildcard()),
            }
        })
        .collect();

    output::print_list(&rows, format)
}
