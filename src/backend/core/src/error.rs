//! Error handling for Paricha Core.
//!
//! This module provides:
//! - A crate-level error type wrapping the ACL, document and settings errors
//! - Machine-readable error codes grouped by category
//! - Severity levels that drive how an error is logged
//! - Metrics integration for error tracking
//!
//! # Usage
//!
//! ```rust,ignore
//! use paricha_core::error::{ErrorContext, Result};
//!
//! fn load() -> Result<String> {
//!     std::fs::read_to_string("acl.toml").context("Failed to read ACL file")
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::acl::{AccessError, ConfigError, DocumentError};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Paricha operations.
pub type Result<T> = std::result::Result<T, ParichaError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ACL Errors (1000-1099)
    InvalidAcl,
    DuplicateRole,
    UnknownParent,
    InheritanceCycle,
    UnknownPredicate,

    // Access Errors (1100-1199)
    AccessDenied,
    PredicateFailed,

    // Document Errors (2000-2099)
    DocumentParse,
    Io,

    // Configuration Errors (5000-5099)
    ConfigurationError,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::InvalidAcl => 1000,
            Self::DuplicateRole => 1001,
            Self::UnknownParent => 1002,
            Self::InheritanceCycle => 1003,
            Self::UnknownPredicate => 1004,

            Self::AccessDenied => 1100,
            Self::PredicateFailed => 1101,

            Self::DocumentParse => 2000,
            Self::Io => 2001,

            Self::ConfigurationError => 5000,

            Self::InternalError => 9000,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "acl",
            1100..=1199 => "access",
            2000..=2099 => "document",
            5000..=5099 => "configuration",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Expected outcomes such as a refused call
    Low,
    /// Broken input supplied by an operator
    Medium,
    /// Faults in collaborators (predicates, file system)
    High,
    /// Bugs
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::AccessDenied => Self::Low,

            ErrorCode::InvalidAcl
            | ErrorCode::DuplicateRole
            | ErrorCode::UnknownParent
            | ErrorCode::InheritanceCycle
            | ErrorCode::UnknownPredicate
            | ErrorCode::DocumentParse
            | ErrorCode::ConfigurationError => Self::Medium,

            ErrorCode::PredicateFailed | ErrorCode::Io => Self::High,

            ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Paricha Core.
#[derive(Error, Debug)]
pub struct ParichaError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Human-readable message
    message: Cow<'static, str>,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for ParichaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl ParichaError {
    /// Create a new error with code and message.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            message: message.into(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message.into())
    }

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    source = ?self.source,
                    "Error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    "Error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    message = %self.message,
                    "Error"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "paricha_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with error code.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| ParichaError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| ParichaError::new(code, e.to_string()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| ParichaError::internal(message.into()))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| ParichaError::new(code, "Value not present"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<ConfigError> for ParichaError {
    fn from(error: ConfigError) -> Self {
        let code = match &error {
            ConfigError::DuplicateRole(_) => ErrorCode::DuplicateRole,
            ConfigError::UnknownParent { .. } => ErrorCode::UnknownParent,
            ConfigError::InheritanceCycle { .. } => ErrorCode::InheritanceCycle,
            ConfigError::UnknownPredicate { .. } => ErrorCode::UnknownPredicate,
            ConfigError::EmptyRoleName | ConfigError::EmptyAction { .. } => ErrorCode::InvalidAcl,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<AccessError> for ParichaError {
    fn from(error: AccessError) -> Self {
        let code = match &error {
            AccessError::Denied(_) => ErrorCode::AccessDenied,
            AccessError::Predicate(_) => ErrorCode::PredicateFailed,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<DocumentError> for ParichaError {
    fn from(error: DocumentError) -> Self {
        let code = match &error {
            DocumentError::Io { .. } => ErrorCode::Io,
            DocumentError::Toml(_) | DocumentError::Json(_) => ErrorCode::DocumentParse,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<config::ConfigError> for ParichaError {
    fn from(error: config::ConfigError) -> Self {
        Self::new(ErrorCode::ConfigurationError, error.to_string()).with_source(error)
    }
}

impl From<toml::de::Error> for ParichaError {
    fn from(error: toml::de::Error) -> Self {
        Self::new(ErrorCode::DocumentParse, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for ParichaError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::DocumentParse, error.to_string()).with_source(error)
    }
}

impl From<std::io::Error> for ParichaError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, error.to_string()).with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{ActionName, PredicateError};

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UnknownParent.category(), "acl");
        assert_eq!(ErrorCode::PredicateFailed.category(), "access");
        assert_eq!(ErrorCode::DocumentParse.category(), "document");
        assert_eq!(ErrorCode::ConfigurationError.category(), "configuration");
        assert_eq!(ErrorCode::InternalError.category(), "internal");
    }

    #[test]
    fn test_error_severity() {
        assert_eq!(ErrorSeverity::from_code(&ErrorCode::AccessDenied), ErrorSeverity::Low);
        assert_eq!(ErrorSeverity::from_code(&ErrorCode::UnknownParent), ErrorSeverity::Medium);
        assert_eq!(ErrorSeverity::from_code(&ErrorCode::PredicateFailed), ErrorSeverity::High);
        assert_eq!(ErrorSeverity::from_code(&ErrorCode::InternalError), ErrorSeverity::Critical);
    }

    #[test]
    fn test_from_config_error() {
        let error: ParichaError = ConfigError::UnknownParent {
            role: "user".into(),
            parent: "ghost".into(),
        }
        .into();
        assert_eq!(error.code(), ErrorCode::UnknownParent);
        assert_eq!(error.to_string(), "[UnknownParent] Role user has unknown parent ghost");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_from_access_error_keeps_denial_and_fault_apart() {
        let denied: ParichaError = AccessError::Denied("Access Denied".into()).into();
        assert_eq!(denied.code(), ErrorCode::AccessDenied);
        assert_eq!(denied.message(), "Access Denied");

        let fault: ParichaError = AccessError::Predicate(PredicateError::new(
            ActionName::from("post:update"),
            anyhow::anyhow!("timeout"),
        ))
        .into();
        assert_eq!(fault.code(), ErrorCode::PredicateFailed);
        assert_eq!(fault.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let error = result.context("Failed to read ACL").unwrap_err();
        assert_eq!(error.code(), ErrorCode::InternalError);
        assert_eq!(error.message(), "Failed to read ACL");

        let missing: Option<u8> = None;
        let error = missing.with_error_code(ErrorCode::ConfigurationError).unwrap_err();
        assert_eq!(error.code(), ErrorCode::ConfigurationError);
    }

    #[test]
    fn test_error_display() {
        let error = ParichaError::configuration("checker.default_role must not be empty");
        assert_eq!(
            error.to_string(),
            "[ConfigurationError] checker.default_role must not be empty"
        );
        error.log();
    }
}
