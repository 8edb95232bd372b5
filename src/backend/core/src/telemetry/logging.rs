//! Structured logging with JSON, pretty and compact formats.
//!
//! The filter is built from the configured level plus per-module overrides.
//! When `RUST_LOG` is set it replaces the configured filter entirely.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty or compact)
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module log levels
    #[serde(default)]
    pub module_levels: BTreeMap<String, String>,

    /// Whether to include file/line information
    #[serde(default)]
    pub include_location: bool,

    /// Whether to include target (module path)
    #[serde(default = "default_include_target")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: BTreeMap::new(),
            include_location: false,
            include_target: default_include_target(),
        }
    }
}

impl LoggingConfig {
    /// Shorthand for a compact, human-readable configuration at `level`.
    pub fn compact(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Compact,
            include_target: false,
            ..Self::default()
        }
    }

    /// The `EnvFilter` directive string: global level, then module overrides.
    pub fn filter_directive(&self) -> String {
        let mut directive = self.level.clone();
        for (module, level) in &self.module_levels {
            directive.push_str(&format!(",{}={}", module, level));
        }
        directive
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production/structured logging
    #[default]
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact single-line format
    Compact,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_include_target() -> bool {
    true
}

/// Initialize the logging subsystem.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directive())?,
    };

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::debug!(filter = %config.filter_directive(), format = ?config.format, "Logging initialized");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
