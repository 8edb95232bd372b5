//! Role-based access control for service calls.
//!
//! This module provides:
//! - **Models**: role and action names, rules, role definitions, service calls
//! - **Compiler**: flattens role inheritance into one rule table per role
//! - **Predicates**: sync and async guards on conditional rules
//! - **Access Checker**: resolves an action against a role's table
//! - **Gate**: passes a call through or rejects it with a message
//! - **Documents**: role definitions loaded from TOML or JSON
//!
//! # Usage
//!
//! ```rust,ignore
//! use paricha_core::acl::{AccessChecker, RoleDefinition, Rule, ServiceCall};
//!
//! let checker = AccessChecker::new(vec![
//!     RoleDefinition::new("guest").allow("session:create"),
//!     RoleDefinition::new("user")
//!         .parent("guest")
//!         .allow("bookmark:create")
//!         .allow(Rule::when("bookmark:update", |params, _| {
//!             params["bookmark"]["user"] == params["user"]["id"]
//!         })),
//! ])?;
//!
//! let gate = checker.check_access("bookmark");
//! let call = gate.check(ServiceCall::new("create", params)).await?;
//! ```

pub mod compiler;
pub mod document;
pub mod evaluator;
pub mod gate;
pub mod models;
pub mod predicate;

pub use compiler::{compile, CompiledAcl, ConfigError, RoleTable};
pub use document::{AclDocument, DocumentError, DocumentFormat, RoleSpec, RuleSpec, WhenSpec};
pub use evaluator::{AccessChecker, AccessDecision};
pub use gate::{AccessError, AccessGate};
pub use models::{ActionName, RoleDefinition, RoleName, Rule, ServiceCall, DEFAULT_ROLE, MSG_DENIED};
pub use predicate::{
    AsyncFnPredicate, FieldEquals, FnPredicate, Predicate, PredicateError, PredicateRegistry,
    TryFnPredicate,
};
