//! Configuration management.

use serde::Deserialize;
use std::path::Path;

use crate::acl::{AccessChecker, AclDocument, PredicateRegistry, DEFAULT_ROLE, MSG_DENIED};
use crate::error::{ErrorCode, ErrorContext, ParichaError, Result};
use crate::telemetry::logging::LoggingConfig;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Access checker configuration
    #[serde(default)]
    pub checker: CheckerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Role assumed when a call carries none
    #[serde(default = "default_role")]
    pub default_role: String,

    /// Message carried by every denial
    #[serde(default = "default_denied_message")]
    pub denied_message: String,

    /// Path of the ACL document (TOML or JSON)
    pub acl_file: Option<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            default_role: default_role(),
            denied_message: default_denied_message(),
            acl_file: None,
        }
    }
}

// Default value functions
fn default_role() -> String { DEFAULT_ROLE.to_string() }
fn default_denied_message() -> String { MSG_DENIED.to_string() }

impl Settings {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PARICHA").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a specific file path, with the environment layered on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_str().context("Configuration path is not valid UTF-8")?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PARICHA").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.checker.default_role.is_empty() {
            return Err(ParichaError::configuration("checker.default_role must not be empty"));
        }
        Ok(())
    }

    /// Load the configured ACL document and compile it into a checker.
    pub fn build_checker(&self, registry: &PredicateRegistry) -> Result<AccessChecker> {
        let path = self
            .checker
            .acl_file
            .as_deref()
            .with_error_code(ErrorCode::ConfigurationError)?;
        let document = AclDocument::load(path)?;
        Ok(self.apply(document.build_checker(registry)?))
    }

    /// Apply the checker defaults to an already built checker.
    pub fn apply(&self, checker: AccessChecker) -> AccessChecker {
        checker
            .with_default_role(self.checker.default_role.as_str())
            .with_denied_message(self.checker.denied_message.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
