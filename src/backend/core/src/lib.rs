//! # Paricha Core
//!
//! Role-based access checks for service method calls.
//!
//! ## Architecture
//!
//! - **ACL Compiler**: flattens a role hierarchy into one rule table per role
//! - **Access Checker**: resolves `service:method` actions, including wildcard
//!   and predicate-guarded rules, against a role's table
//! - **Gate**: lets a call through unchanged or rejects it with a message
//! - **Documents**: role definitions written as TOML or JSON
//! - **Config**: layered settings from files and `PARICHA__*` environment variables
//! - **Telemetry**: structured logging through `tracing`

pub mod acl;
pub mod config;
pub mod error;
pub mod telemetry;

pub use error::{ErrorCode, ErrorContext, ErrorSeverity, ParichaError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::acl::{
        AccessChecker, AccessDecision, AccessError, AccessGate, AclDocument, ActionName,
        CompiledAcl, ConfigError, FieldEquals, Predicate, PredicateError, PredicateRegistry,
        RoleDefinition, RoleName, RoleTable, Rule, ServiceCall,
    };
    pub use crate::config::Settings;
    pub use crate::error::{ErrorCode, ErrorContext, ErrorSeverity, ParichaError, Result};
}
