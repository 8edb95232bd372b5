//! Runtime guards on conditional rules.
//!
//! Every predicate is consumed through one async contract, [`Predicate::check`].
//! A predicate that already knows its answer simply returns it; one that has to
//! look something up awaits inside `check`. The evaluator cannot tell the two
//! apart.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use super::models::{ActionName, ServiceCall};

/// A guard deciding whether a conditional rule applies to one call.
#[async_trait]
pub trait Predicate: Send + Sync {
    /// Return `Ok(true)` to grant, `Ok(false)` to deny.
    ///
    /// An `Err` is a fault in the predicate itself and aborts the evaluation.
    async fn check(&self, params: &Value, call: &ServiceCall) -> anyhow::Result<bool>;
}

/// A predicate failed while deciding on `action`.
#[derive(Debug, Error)]
#[error("Predicate for {action} failed: {source}")]
pub struct PredicateError {
    pub action: ActionName,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl PredicateError {
    pub fn new(action: ActionName, source: anyhow::Error) -> Self {
        Self {
            action,
            source: source.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Closure adapters
// ═══════════════════════════════════════════════════════════════════════════════

/// Infallible synchronous closure.
pub struct FnPredicate<F>(F);

impl<F> FnPredicate<F>
where
    F: Fn(&Value, &ServiceCall) -> bool + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self(check)
    }
}

#[async_trait]
impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Value, &ServiceCall) -> bool + Send + Sync,
{
    async fn check(&self, params: &Value, call: &ServiceCall) -> anyhow::Result<bool> {
        Ok((self.0)(params, call))
    }
}

/// Fallible synchronous closure.
pub struct TryFnPredicate<F>(F);

impl<F> TryFnPredicate<F>
where
    F: Fn(&Value, &ServiceCall) -> anyhow::Result<bool> + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self(check)
    }
}

#[async_trait]
impl<F> Predicate for TryFnPredicate<F>
where
    F: Fn(&Value, &ServiceCall) -> anyhow::Result<bool> + Send + Sync,
{
    async fn check(&self, params: &Value, call: &ServiceCall) -> anyhow::Result<bool> {
        (self.0)(params, call)
    }
}

/// Closure returning a future.
pub struct AsyncFnPredicate<F>(F);

impl<F, Fut> AsyncFnPredicate<F>
where
    F: Fn(Value, ServiceCall) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    pub fn new(check: F) -> Self {
        Self(check)
    }
}

#[async_trait]
impl<F, Fut> Predicate for AsyncFnPredicate<F>
where
    F: Fn(Value, ServiceCall) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn check(&self, params: &Value, call: &ServiceCall) -> anyhow::Result<bool> {
        (self.0)(params.clone(), call.clone()).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Built-in predicates
// ═══════════════════════════════════════════════════════════════════════════════

/// Grants when two dot-separated paths into the params resolve to equal values.
///
/// `FieldEquals::new("bookmark.user", "user.id")` grants when
/// `params.bookmark.user == params.user.id`. A path that does not resolve
/// denies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEquals {
    left: String,
    right: String,
}

impl FieldEquals {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    fn lookup<'a>(params: &'a Value, path: &str) -> Option<&'a Value> {
        path.split('.')
            .try_fold(params, |value, key| match value {
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => value.get(key),
            })
            .filter(|value| !value.is_null())
    }
}

#[async_trait]
impl Predicate for FieldEquals {
    async fn check(&self, params: &Value, _call: &ServiceCall) -> anyhow::Result<bool> {
        let left = Self::lookup(params, &self.left);
        let right = Self::lookup(params, &self.right);
        Ok(matches!((left, right), (Some(l), Some(r)) if l == r))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Named predicates that ACL documents can refer to with `when = { predicate = "..." }`.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, Arc<dyn Predicate>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `predicate` under `name`, replacing any previous entry.
    pub fn register(mut self, name: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Predicate>> {
        self.predicates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.predicates.keys().collect();
        names.sort();
        f.debug_struct("PredicateRegistry").field("names", &names).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
