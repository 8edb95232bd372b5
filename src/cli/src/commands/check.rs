//! Check command: run one call through the access gate.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};

use paricha_core::acl::{AccessError, ActionName, ServiceCall};
use paricha_core::error::ParichaError;

use super::AclSource;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Service name
    service: String,

    /// Method called on the service
    method: String,

    /// Role to run as (sets params.user.role)
    #[arg(short, long)]
    role: Option<String>,

    /// Call params as a JSON object
    #[arg(short, long)]
    params: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    action: String,
    role: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub async fn execute(args: CheckArgs, source: &AclSource, format: OutputFormat) -> Result<()> {
    let (_, checker) = source.load_checker()?;
    let call = build_call(&args.method, args.role.as_deref(), args.params.as_deref())?;

    let action = ActionName::for_call(&args.service, &call.method).to_string();
    let role = checker.role_of(&call).to_string();
    let gate = checker.check_access(args.service);

    match gate.check(call).await {
        Ok(_) => {
            let report = CheckReport { action, role, outcome: "granted", message: None };
            match format {
                OutputFormat::Table => output::print_success(&format!("{} granted to {}", report.action, report.role)),
                _ => output::print_item(&report, format)?,
            }
            Ok(())
        }
        Err(AccessError::Denied(message)) => {
            let summary = format!("{} denied to {}: {}", action, role, message);
            let report = CheckReport { action, role, outcome: "denied", message: Some(message) };
            match format {
                OutputFormat::Table => output::print_denied(&summary),
                _ => output::print_item(&report, format)?,
            }
            bail!("Access denied")
        }
        Err(err) => Err(ParichaError::from(err)).context("Predicate failed while checking access"),
    }
}

/// Build the call from the raw `--params` JSON, writing `--role` into
/// `params.user.role`.
fn build_call(method: &str, role: Option<&str>, params: Option<&str>) -> Result<ServiceCall> {
    let mut params: Value = match params {
        Some(raw) => serde_json::from_str(raw).context("--params is not valid JSON")?,
        None => json!({}),
    };

    if let Some(role) = role {
        let object = params
            .as_object_mut()
            .context("--params must be a JSON object when --role is given")?;
        let user = object.entry("user").or_insert_with(|| json!({}));
        match user.as_object_mut() {
            Some(user) => {
                user.insert("role".to_string(), json!(role));
            }
            None => *user = json!({ "role": role }),
        }
    }

    Ok(ServiceCall::new(method, params))
}
