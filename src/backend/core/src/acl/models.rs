//! ACL data models: role and action identifiers, rules, role definitions and
//! the service call that flows through the gate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::predicate::{AsyncFnPredicate, FnPredicate, Predicate, TryFnPredicate};

/// Role used when a call carries no `params.user.role`.
pub const DEFAULT_ROLE: &str = "guest";

/// Message attached to every denial unless the checker overrides it.
pub const MSG_DENIED: &str = "Access Denied";

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleName(pub String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoleName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for RoleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An action identifier of the form `service:method`, or the wildcard `*`.
///
/// Action names are opaque: the checker never splits them, it only compares
/// them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionName(pub String);

impl ActionName {
    /// The reserved identifier matching any action.
    pub const WILDCARD: &'static str = "*";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build the action name for a method call on a service.
    pub fn for_call(service: &str, method: &str) -> Self {
        Self(format!("{}:{}", service, method))
    }

    pub fn wildcard() -> Self {
        Self(Self::WILDCARD.to_string())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == Self::WILDCARD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ActionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ActionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for ActionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rule
// ═══════════════════════════════════════════════════════════════════════════════

/// A single allow entry: an action, optionally guarded by a predicate.
///
/// A rule without a predicate is an unconditional grant. Rules are cheap to
/// clone; the predicate is shared.
#[derive(Clone)]
pub struct Rule {
    /// The action this rule grants.
    pub action: ActionName,
    /// Guard evaluated per request, if any.
    pub when: Option<Arc<dyn Predicate>>,
}

impl Rule {
    /// Unconditional grant of `action`.
    pub fn allow(action: impl Into<ActionName>) -> Self {
        Self {
            action: action.into(),
            when: None,
        }
    }

    /// Grant `action` when the synchronous check returns `true`.
    pub fn when<F>(action: impl Into<ActionName>, check: F) -> Self
    where
        F: Fn(&Value, &ServiceCall) -> bool + Send + Sync + 'static,
    {
        Self::with_predicate(action, FnPredicate::new(check))
    }

    /// Grant `action` when the synchronous, fallible check returns `Ok(true)`.
    pub fn try_when<F>(action: impl Into<ActionName>, check: F) -> Self
    where
        F: Fn(&Value, &ServiceCall) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::with_predicate(action, TryFnPredicate::new(check))
    }

    /// Grant `action` when the future produced by `check` resolves to `Ok(true)`.
    ///
    /// The closure receives owned copies of the params and the call so the
    /// future can outlive the borrow of the request.
    pub fn when_async<F, Fut>(action: impl Into<ActionName>, check: F) -> Self
    where
        F: Fn(Value, ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Self::with_predicate(action, AsyncFnPredicate::new(check))
    }

    /// Grant `action` guarded by an existing predicate.
    pub fn with_predicate(action: impl Into<ActionName>, predicate: impl Predicate + 'static) -> Self {
        Self {
            action: action.into(),
            when: Some(Arc::new(predicate)),
        }
    }

    /// Grant `action` guarded by a shared predicate.
    pub fn with_shared_predicate(action: impl Into<ActionName>, predicate: Arc<dyn Predicate>) -> Self {
        Self {
            action: action.into(),
            when: Some(predicate),
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.when.is_some()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("action", &self.action)
            .field("conditional", &self.is_conditional())
            .finish()
    }
}

impl From<&str> for Rule {
    fn from(action: &str) -> Self {
        Self::allow(action)
    }
}

impl From<String> for Rule {
    fn from(action: String) -> Self {
        Self::allow(action)
    }
}

impl From<ActionName> for Rule {
    fn from(action: ActionName) -> Self {
        Self::allow(action)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role definition
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw input to the compiler: a role, its optional parent and its own rules.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub name: RoleName,
    pub parent: Option<RoleName>,
    pub allow: Vec<Rule>,
}

impl RoleDefinition {
    /// Create a root role with no rules.
    pub fn new(name: impl Into<RoleName>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            allow: Vec::new(),
        }
    }

    /// Set the parent role.
    pub fn parent(mut self, parent: impl Into<RoleName>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Append one rule.
    pub fn allow(mut self, rule: impl Into<Rule>) -> Self {
        self.allow.push(rule.into());
        self
    }

    /// Append several rules.
    pub fn allow_all<I, R>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        self.allow.extend(rules.into_iter().map(Into::into));
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service call
// ═══════════════════════════════════════════════════════════════════════════════

/// A method call on a service, as seen by the gate.
///
/// `params` is an opaque bag. The checker only reads `params.user.role`; the
/// whole bag and the call itself are handed to predicates unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl ServiceCall {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// The caller's role from `params.user.role`.
    ///
    /// Returns `None` when `user` or `role` is missing, or when `role` is
    /// `null`, `false`, `0` or `""`. Any other non-string value becomes its
    /// JSON text, which names no defined role.
    pub fn role(&self) -> Option<Cow<'_, str>> {
        match self.params.get("user")?.get("role")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(role) if role.is_empty() => None,
            Value::String(role) => Some(Cow::Borrowed(role)),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
