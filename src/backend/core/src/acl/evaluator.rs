//! Access checker: resolves an action against a role's compiled table.
//!
//! The checker answers "may role R perform action A for this call?". Lookup
//! order is the exact action, then the role's wildcard rule. An unknown role
//! has no rules. A conditional rule grants only if its predicate does.

use metrics::counter;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use super::compiler::{compile, CompiledAcl, ConfigError};
use super::gate::AccessGate;
use super::models::{ActionName, RoleDefinition, ServiceCall, DEFAULT_ROLE, MSG_DENIED};
use super::predicate::PredicateError;

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of an access evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with the message to report.
    Deny(String),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// The denial message, or `""` for a grant.
    pub fn message(&self) -> &str {
        match self {
            Self::Allow => "",
            Self::Deny(message) => message,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access checker
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiled ACL plus the defaults applied at request time.
///
/// Cheap to clone; every clone shares the same compiled tables.
#[derive(Debug, Clone)]
pub struct AccessChecker {
    acl: Arc<CompiledAcl>,
    default_role: String,
    denied_message: String,
}

impl AccessChecker {
    /// Compile `definitions` into a checker.
    pub fn new(definitions: Vec<RoleDefinition>) -> Result<Self, ConfigError> {
        Ok(Self::from_compiled(compile(definitions)?))
    }

    /// Wrap an already compiled ACL.
    pub fn from_compiled(acl: CompiledAcl) -> Self {
        Self {
            acl: Arc::new(acl),
            default_role: DEFAULT_ROLE.to_string(),
            denied_message: MSG_DENIED.to_string(),
        }
    }

    /// Role assumed for calls that carry none (`"guest"` unless overridden).
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Message carried by every denial (`"Access Denied"` unless overridden).
    pub fn with_denied_message(mut self, message: impl Into<String>) -> Self {
        self.denied_message = message.into();
        self
    }

    pub fn acl(&self) -> &CompiledAcl {
        &self.acl
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    pub fn denied_message(&self) -> &str {
        &self.denied_message
    }

    /// The role a call runs as: `params.user.role`, else the default role.
    pub fn role_of<'a>(&'a self, call: &'a ServiceCall) -> Cow<'a, str> {
        call.role().unwrap_or(Cow::Borrowed(self.default_role.as_str()))
    }

    /// Decide whether `role` may perform `action`.
    ///
    /// `params` and `call` are passed untouched to the predicate of a
    /// conditional rule. A failing predicate is returned as an error, never
    /// as a denial.
    pub async fn evaluate(
        &self,
        role: &str,
        action: &ActionName,
        params: &Value,
        call: &ServiceCall,
    ) -> Result<AccessDecision, PredicateError> {
        let rule = self
            .acl
            .table(role)
            .and_then(|table| table.resolve(action.as_str()));

        let Some(rule) = rule else {
            debug!(role = %role, action = %action, "No rule matches, access denied");
            record_decision("denied");
            return Ok(self.deny());
        };

        let Some(predicate) = &rule.when else {
            debug!(role = %role, action = %action, rule = %rule.action, "Access granted");
            record_decision("granted");
            return Ok(AccessDecision::Allow);
        };

        match predicate.check(params, call).await {
            Ok(true) => {
                debug!(role = %role, action = %action, rule = %rule.action, "Predicate passed, access granted");
                record_decision("granted");
                Ok(AccessDecision::Allow)
            }
            Ok(false) => {
                debug!(role = %role, action = %action, rule = %rule.action, "Predicate rejected, access denied");
                record_decision("denied");
                Ok(self.deny())
            }
            Err(source) => {
                warn!(role = %role, action = %action, error = %source, "Predicate failed");
                record_decision("predicate_error");
                Err(PredicateError::new(action.clone(), source))
            }
        }
    }

    /// Evaluate `service:method` for a call, resolving the caller's role from it.
    pub async fn get_permission(
        &self,
        service: &str,
        call: &ServiceCall,
    ) -> Result<AccessDecision, PredicateError> {
        let action = ActionName::for_call(service, &call.method);
        let role = self.role_of(call);
        debug!(service, method = %call.method, role = %role, "Checking access");
        self.evaluate(&role, &action, &call.params, call).await
    }

    /// A gate guarding every method of `service`.
    pub fn check_access(&self, service: impl Into<String>) -> AccessGate {
        AccessGate::new(self.clone(), service)
    }

    fn deny(&self) -> AccessDecision {
        AccessDecision::Deny(self.denied_message.clone())
    }
}

fn record_decision(outcome: &'static str) {
    counter!("paricha_access_decisions_total", "outcome" => outcome).increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
