//! Validate command: load and compile the ACL document.

use anyhow::Result;
use serde::Serialize;

use super::AclSource;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize)]
struct ValidationReport {
    file: String,
    valid: bool,
    roles: usize,
    default_role: String,
    default_role_defined: bool,
}

pub async fn execute(source: &AclSource, format: OutputFormat) -> Result<()> {
    let (_, checker) = source.load_checker()?;

    let report = ValidationReport {
        file: source.path().display().to_string(),
        valid: true,
        roles: checker.acl().len(),
        default_role: checker.default_role().to_string(),
        default_role_defined: checker.acl().contains_role(checker.default_role()),
    };

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("{}: {} roles compiled", report.file, report.roles));
            if !report.default_role_defined {
                output::print_detail(
                    "Note",
                    &format!("default role '{}' is not defined; anonymous calls are denied", report.default_role),
                );
            }
        }
        _ => output::print_item(&report, format)?,
    }

    Ok(())
}
