//! ACL documents: role definitions written as TOML or JSON.
//!
//! ```toml
//! [roles.guest]
//! allow = ["session:create"]
//!
//! [roles.user]
//! parent = "guest"
//! allow = [
//!   "bookmark:create",
//!   { action = "bookmark:update", when = { equals = ["bookmark.user", "user.id"] } },
//!   { action = "bookmark:share", when = { predicate = "is_public" } },
//! ]
//! ```
//!
//! `equals` compares two dot-separated paths into the call params.
//! `predicate` names an entry of a [`PredicateRegistry`].

use serde::de::{self, value::MapAccessDeserializer, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::compiler::ConfigError;
use super::evaluator::AccessChecker;
use super::models::{RoleDefinition, Rule};
use super::predicate::{FieldEquals, PredicateRegistry};

/// Errors reading or parsing an ACL document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read ACL document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML ACL document: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON ACL document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Toml,
    Json,
}

impl DocumentFormat {
    /// `.json` files are JSON; everything else is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Top-level document: role name → role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclDocument {
    #[serde(default)]
    pub roles: BTreeMap<String, RoleSpec>,
}

/// One role as written in a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSpec {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub allow: Vec<RuleSpec>,
}

/// An allow entry: a bare action or an action with a guard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleSpec {
    Action(String),
    Guarded(GuardedRuleSpec),
}

// Dispatches on the shape of the entry so field errors inside a guarded rule
// reach the user with the field name.
impl<'de> Deserialize<'de> for RuleSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleSpecVisitor;

        impl<'de> Visitor<'de> for RuleSpecVisitor {
            type Value = RuleSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an action string or a table with `action` and optional `when`")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<RuleSpec, E> {
                Ok(RuleSpec::Action(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<RuleSpec, E> {
                Ok(RuleSpec::Action(value))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<RuleSpec, A::Error> {
                GuardedRuleSpec::deserialize(MapAccessDeserializer::new(map)).map(RuleSpec::Guarded)
            }
        }

        deserializer.deserialize_any(RuleSpecVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardedRuleSpec {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<WhenSpec>,
}

/// Declarative guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum WhenSpec {
    /// Both params paths resolve to the same value.
    Equals([String; 2]),
    /// A predicate registered under this name.
    Predicate(String),
}

impl RuleSpec {
    pub fn action(&self) -> &str {
        match self {
            Self::Action(action) => action,
            Self::Guarded(guarded) => &guarded.action,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Guarded(GuardedRuleSpec { when: Some(_), .. }))
    }

    fn to_rule(&self, role: &str, registry: &PredicateRegistry) -> Result<Rule, ConfigError> {
        let (action, when) = match self {
            Self::Action(action) => return Ok(Rule::allow(action.as_str())),
            Self::Guarded(GuardedRuleSpec { action, when }) => (action, when),
        };

        match when {
            None => Ok(Rule::allow(action.as_str())),
            Some(WhenSpec::Equals([left, right])) => Ok(Rule::with_predicate(
                action.as_str(),
                FieldEquals::new(left.as_str(), right.as_str()),
            )),
            Some(WhenSpec::Predicate(name)) => {
                let predicate = registry.get(name).ok_or_else(|| ConfigError::UnknownPredicate {
                    role: role.to_string(),
                    action: action.clone(),
                    name: name.clone(),
                })?;
                Ok(Rule::with_shared_predicate(action.as_str(), predicate))
            }
        }
    }
}

impl AclDocument {
    pub fn from_toml_str(source: &str) -> Result<Self, DocumentError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn parse(source: &str, format: DocumentFormat) -> Result<Self, DocumentError> {
        match format {
            DocumentFormat::Toml => Self::from_toml_str(source),
            DocumentFormat::Json => Self::from_json_str(source),
        }
    }

    /// Read a document from disk; the format follows the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&source, DocumentFormat::from_path(path))?;
        debug!(path = %path.display(), roles = document.roles.len(), "Loaded ACL document");
        Ok(document)
    }

    /// Turn the document into role definitions, resolving named predicates.
    pub fn to_definitions(&self, registry: &PredicateRegistry) -> Result<Vec<RoleDefinition>, ConfigError> {
        self.roles
            .iter()
            .map(|(name, spec)| {
                let allow = spec
                    .allow
                    .iter()
                    .map(|rule| rule.to_rule(name, registry))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RoleDefinition {
                    name: name.as_str().into(),
                    parent: spec.parent.as_deref().map(Into::into),
                    allow,
                })
            })
            .collect()
    }

    /// Compile the document into a checker.
    pub fn build_checker(&self, registry: &PredicateRegistry) -> Result<AccessChecker, ConfigError> {
        AccessChecker::new(self.to_definitions(registry)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
