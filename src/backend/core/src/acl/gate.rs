//! The gate placed in front of a service's methods.
//!
//! A granted call passes through unchanged; anything else is rejected with
//! either the denial message or the predicate fault.

use thiserror::Error;
use tracing::{info, warn};

use super::evaluator::{AccessChecker, AccessDecision};
use super::models::ServiceCall;
use super::predicate::PredicateError;

/// Why the gate rejected a call.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No rule granted the action. Carries the message for the caller.
    #[error("{0}")]
    Denied(String),

    /// A predicate failed while deciding.
    #[error(transparent)]
    Predicate(#[from] PredicateError),
}

impl AccessError {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    pub fn is_predicate_failure(&self) -> bool {
        matches!(self, Self::Predicate(_))
    }
}

/// Checks every call to one service against an [`AccessChecker`].
#[derive(Debug, Clone)]
pub struct AccessGate {
    checker: AccessChecker,
    service: String,
}

impl AccessGate {
    pub fn new(checker: AccessChecker, service: impl Into<String>) -> Self {
        Self {
            checker,
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Return `call` untouched if it is allowed, otherwise the rejection.
    pub async fn check(&self, call: ServiceCall) -> Result<ServiceCall, AccessError> {
        match self.checker.get_permission(&self.service, &call).await {
            Ok(AccessDecision::Allow) => Ok(call),
            Ok(AccessDecision::Deny(message)) => {
                info!(
                    service = %self.service,
                    method = %call.method,
                    role = %self.checker.role_of(&call),
                    "Call rejected"
                );
                Err(AccessError::Denied(message))
            }
            Err(err) => {
                warn!(
                    service = %self.service,
                    method = %call.method,
                    error = %err,
                    "Call aborted by predicate failure"
                );
                Err(AccessError::Predicate(err))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::models::{RoleDefinition, Rule};
    use serde_json::json;

    fn gate(service: &str) -> AccessGate {
        AccessChecker::new(vec![
            RoleDefinition::new("guest").allow("session:create"),
            RoleDefinition::new("user")
                .parent("guest")
                .allow(Rule::try_when("session:remove", |_, _| Err(anyhow::anyhow!("boom")))),
        ])
        .unwrap()
        .check_access(service)
    }

    #[tokio::test]
    async fn test_granted_call_passes_through_unchanged() {
        let call = ServiceCall::new("create", json!({ "user": { "role": "guest" }, "extra": [1, 2] }));
        let passed = gate("session").check(call.clone()).await.unwrap();
        assert_eq!(passed, call);
    }

    #[tokio::test]
    async fn test_denied_call_carries_message() {
        let err = gate("session")
            .check(ServiceCall::new("list", json!({})))
            .await
            .unwrap_err();
        assert!(err.is_denied());
        assert_eq!(err.to_string(), "Access Denied");
    }

    #[tokio::test]
    async fn test_predicate_failure_surfaces_distinctly() {
        let err = gate("session")
            .check(ServiceCall::new("remove", json!({ "user": { "role": "user" } })))
            .await
            .unwrap_err();
        assert!(err.is_predicate_failure());
        assert!(!err.is_denied());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_gate_service() {
        assert_eq!(gate("session").service(), "session");
    }

    #[test]
    fn test_gate_outside_runtime() {
        let gate = gate("session");
        let call = ServiceCall::new("create", json!({}));
        assert!(tokio_test::block_on(gate.check(call)).is_ok());
    }
}
