//! Compiles role definitions into flattened per-role rule tables.
//!
//! Compilation runs in three passes:
//!
//! 1. every role gets a table of its own rules (a later rule for the same
//!    action replaces an earlier one);
//! 2. the roles are arranged into a parent → children tree;
//! 3. the tree is walked from each root, parents before children, and every
//!    non-root role absorbs its parent's finished table.
//!
//! In the merge, the parent's entry replaces the child's entry for the same
//! action. Since the parent's table already holds everything inherited from
//! further up, the outermost ancestor that declares an action decides the rule
//! for every descendant.

use std::collections::hash_map;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

use super::models::{ActionName, RoleDefinition, RoleName, Rule};

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Invalid role definitions, reported before any table is handed out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Role name must not be empty")]
    EmptyRoleName,

    #[error("Duplicate role name: {0}")]
    DuplicateRole(String),

    #[error("Role {role} has unknown parent {parent}")]
    UnknownParent { role: String, parent: String },

    #[error("Inheritance cycle among roles: {}", roles.join(", "))]
    InheritanceCycle { roles: Vec<String> },

    #[error("Role {role} allows an empty action")]
    EmptyAction { role: String },

    #[error("Role {role} guards {action} with unknown predicate {name}")]
    UnknownPredicate {
        role: String,
        action: String,
        name: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════════

/// The effective rules of one role after inheritance, keyed by action.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    rules: HashMap<ActionName, Rule>,
}

impl RoleTable {
    fn from_rules(rules: Vec<Rule>) -> Self {
        let mut table = HashMap::with_capacity(rules.len());
        for rule in rules {
            table.insert(rule.action.clone(), rule);
        }
        Self { rules: table }
    }

    /// Copy every rule of `parent` into this table, replacing same-action entries.
    fn inherit(&mut self, parent: &RoleTable) {
        self.rules
            .extend(parent.rules.iter().map(|(action, rule)| (action.clone(), rule.clone())));
    }

    /// The rule declared for exactly `action`.
    pub fn get(&self, action: &str) -> Option<&Rule> {
        self.rules.get(action)
    }

    /// The rule for `action`, falling back to the wildcard rule.
    pub fn resolve(&self, action: &str) -> Option<&Rule> {
        self.rules
            .get(action)
            .or_else(|| self.rules.get(ActionName::WILDCARD))
    }

    pub fn contains(&self, action: &str) -> bool {
        self.rules.contains_key(action)
    }

    pub fn has_wildcard(&self) -> bool {
        self.contains(ActionName::WILDCARD)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Action names in sorted order.
    pub fn actions(&self) -> Vec<&ActionName> {
        let mut actions: Vec<&ActionName> = self.rules.keys().collect();
        actions.sort();
        actions
    }

    pub fn iter(&self) -> hash_map::Iter<'_, ActionName, Rule> {
        self.rules.iter()
    }
}

/// Role name → effective table, plus each role's parent. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct CompiledAcl {
    tables: HashMap<RoleName, RoleTable>,
    parents: HashMap<RoleName, Option<RoleName>>,
}

impl CompiledAcl {
    pub fn table(&self, role: &str) -> Option<&RoleTable> {
        self.tables.get(role)
    }

    pub fn parent_of(&self, role: &str) -> Option<&RoleName> {
        self.parents.get(role).and_then(Option::as_ref)
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.tables.contains_key(role)
    }

    /// Role names in sorted order.
    pub fn roles(&self) -> Vec<&RoleName> {
        let mut roles: Vec<&RoleName> = self.tables.keys().collect();
        roles.sort();
        roles
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role tree
// ═══════════════════════════════════════════════════════════════════════════════

/// Arena of roles; parent and children are indices into `nodes`.
struct RoleTree {
    nodes: Vec<RoleNode>,
    roots: Vec<usize>,
}

struct RoleNode {
    parent: Option<usize>,
    children: Vec<usize>,
}

impl RoleTree {
    fn build(definitions: &[RoleDefinition], index: &HashMap<&str, usize>) -> Result<Self, ConfigError> {
        let mut nodes: Vec<RoleNode> = definitions
            .iter()
            .map(|_| RoleNode {
                parent: None,
                children: Vec::new(),
            })
            .collect();
        let mut roots = Vec::new();

        for (i, def) in definitions.iter().enumerate() {
            match &def.parent {
                None => roots.push(i),
                Some(parent) => {
                    let Some(&p) = index.get(parent.as_str()) else {
                        warn!(role = %def.name, parent = %parent, "Unknown parent role");
                        return Err(ConfigError::UnknownParent {
                            role: def.name.to_string(),
                            parent: parent.to_string(),
                        });
                    };
                    nodes[i].parent = Some(p);
                    nodes[p].children.push(i);
                }
            }
        }

        Ok(Self { nodes, roots })
    }

    /// Node indices with every parent ahead of its children.
    ///
    /// Nodes on an inheritance cycle are never reached from a root and are
    /// left out.
    fn parent_first_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }

        order
    }

    /// Nodes lying on a parent cycle.
    ///
    /// Only nodes outside `reached` are walked. Their parent chains never end
    /// at a root, so each one runs into a cycle; nodes merely hanging off a
    /// cycle are not members.
    fn cycle_members(&self, reached: &HashSet<usize>) -> Vec<usize> {
        let mut done = vec![false; self.nodes.len()];
        let mut members = Vec::new();

        for start in 0..self.nodes.len() {
            if done[start] || reached.contains(&start) {
                continue;
            }

            let mut path: Vec<usize> = Vec::new();
            let mut position: HashMap<usize, usize> = HashMap::new();
            let mut current = Some(start);
            while let Some(i) = current {
                if done[i] || reached.contains(&i) {
                    break;
                }
                if let Some(&at) = position.get(&i) {
                    members.extend_from_slice(&path[at..]);
                    break;
                }
                position.insert(i, path.len());
                path.push(i);
                current = self.nodes[i].parent;
            }

            for i in path {
                done[i] = true;
            }
        }

        members
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Compiler
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile role definitions into a [`CompiledAcl`].
pub fn compile(definitions: Vec<RoleDefinition>) -> Result<CompiledAcl, ConfigError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(definitions.len());
    for (i, def) in definitions.iter().enumerate() {
        if def.name.as_str().is_empty() {
            return Err(ConfigError::EmptyRoleName);
        }
        if index.insert(def.name.as_str(), i).is_some() {
            return Err(ConfigError::DuplicateRole(def.name.to_string()));
        }
        if def.allow.iter().any(|rule| rule.action.as_str().is_empty()) {
            return Err(ConfigError::EmptyAction {
                role: def.name.to_string(),
            });
        }
    }

    let tree = RoleTree::build(&definitions, &index)?;
    let order = tree.parent_first_order();

    if order.len() < definitions.len() {
        let reached: HashSet<usize> = order.iter().copied().collect();
        let mut roles: Vec<String> = tree
            .cycle_members(&reached)
            .into_iter()
            .map(|i| definitions[i].name.to_string())
            .collect();
        roles.sort();
        warn!(roles = ?roles, "Inheritance cycle in role definitions");
        return Err(ConfigError::InheritanceCycle { roles });
    }

    let roots = tree.roots.len();
    let mut names = Vec::with_capacity(definitions.len());
    let mut parents = HashMap::with_capacity(definitions.len());
    let mut tables: Vec<RoleTable> = Vec::with_capacity(definitions.len());
    for def in definitions {
        parents.insert(def.name.clone(), def.parent);
        names.push(def.name);
        tables.push(RoleTable::from_rules(def.allow));
    }

    for &i in &order {
        if let Some(p) = tree.nodes[i].parent {
            let inherited = tables[p].clone();
            tables[i].inherit(&inherited);
        }
    }

    let tables: HashMap<RoleName, RoleTable> = names.into_iter().zip(tables).collect();
    debug!(roles = tables.len(), roots, "Compiled ACL");

    Ok(CompiledAcl { tables, parents })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
