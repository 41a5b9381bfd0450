//! Per-node permission checks
//!
//! The dispatch engine only consumes a yes/no answer per (caller, node,
//! action). `RbacPolicy` is the built-in role based implementation.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Caller;
use crate::Result;

/// Action a caller wants to perform on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "cluster:read")]
    Read,
    #[serde(rename = "cluster:read_config")]
    ReadConfig,
    #[serde(rename = "cluster:read_logs")]
    ReadLogs,
    #[serde(rename = "cluster:restart")]
    Restart,
    #[serde(rename = "cluster:update_config")]
    UpdateConfig,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "cluster:read",
            Self::ReadConfig => "cluster:read_config",
            Self::ReadLogs => "cluster:read_logs",
            Self::Restart => "cluster:restart",
            Self::UpdateConfig => "cluster:update_config",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Answers whether a caller may run an action on a node
///
/// Checked before the node's existence is known, so implementations must not
/// assume the node id is part of the topology.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Decide for a single node
    ///
    /// # Errors
    ///
    /// Returns error if the policy backend cannot be consulted
    async fn check(&self, caller: &Caller, node_id: &str, action: Action) -> Result<Decision>;
}

/// Rule effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// One policy statement
///
/// Actions are `cluster:<verb>` strings, `cluster:*` or `*`. Resources are
/// `node:id:<name>`, `node:id:*` or `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    #[serde(default)]
    pub effect: Effect,
}

impl Rule {
    fn matches(&self, node_id: &str, action: Action) -> bool {
        self.actions.iter().any(|a| action_matches(a, action))
            && self.resources.iter().any(|r| resource_matches(r, node_id))
    }
}

fn action_matches(pattern: &str, action: Action) -> bool {
    pattern == "*"
        || pattern == action.as_str()
        || pattern
            .strip_suffix('*')
            .is_some_and(|prefix| action.as_str().starts_with(prefix))
}

fn resource_matches(pattern: &str, node_id: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    pattern
        .strip_prefix("node:id:")
        .is_some_and(|id| id == "*" || id == node_id)
}

/// Named role and the rules it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Static role based policy
///
/// A matching deny rule on any of the caller's roles wins over allows; no
/// matching rule at all denies.
#[derive(Debug, Clone, Default)]
pub struct RbacPolicy {
    roles: HashMap<String, Vec<Rule>>,
}

impl RbacPolicy {
    #[must_use]
    pub fn new(definitions: Vec<RoleDefinition>) -> Self {
        let mut roles: HashMap<String, Vec<Rule>> = HashMap::new();
        for def in definitions {
            roles.entry(def.name).or_default().extend(def.rules);
        }
        Self { roles }
    }

    /// Built-in roles: `administrator` (everything) and `readonly`
    /// (every read action on every node)
    #[must_use]
    pub fn default_roles() -> Vec<RoleDefinition> {
        vec![
            RoleDefinition {
                name: "administrator".to_string(),
                rules: vec![Rule {
                    actions: vec!["*".to_string()],
                    resources: vec!["*".to_string()],
                    effect: Effect::Allow,
                }],
            },
            RoleDefinition {
                name: "readonly".to_string(),
                rules: vec![Rule {
                    actions: [Action::Read, Action::ReadConfig, Action::ReadLogs]
                        .iter()
                        .map(|a| a.as_str().to_string())
                        .collect(),
                    resources: vec!["node:id:*".to_string()],
                    effect: Effect::Allow,
                }],
            },
        ]
    }

    /// Evaluate the policy synchronously
    #[must_use]
    pub fn evaluate(&self, caller: &Caller, node_id: &str, action: Action) -> Decision {
        let mut allowed = false;
        for rule in caller
            .roles
            .iter()
            .filter_map(|role| self.roles.get(role))
            .flatten()
            .filter(|rule| rule.matches(node_id, action))
        {
            match rule.effect {
                Effect::Deny => {
                    return Decision::Deny(format!("{action} explicitly denied on node '{node_id}'"));
                }
                Effect::Allow => allowed = true,
            }
        }

        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(format!("no rule grants {action} on node '{node_id}'"))
        }
    }
}

#[async_trait]
impl PermissionResolver for RbacPolicy {
    async fn check(&self, caller: &Caller, node_id: &str, action: Action) -> Result<Decision> {
        Ok(self.evaluate(caller, node_id, action))
    }
}
