//! Expansion of a request's node filter into the candidate set

use std::collections::HashSet;

use serde_json::Value;

use super::registry::Topology;
use super::types::{Node, NodeRole};

/// Narrowing applied to candidates before dispatch
///
/// Nodes removed here never appear in either total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub role: Option<NodeRole>,
    /// Case-insensitive substring matched against the node's field values
    pub search: Option<String>,
}

impl NodeFilter {
    /// Whether a known node passes the filter
    #[must_use]
    pub fn matches(&self, node: &Node) -> bool {
        if self.role.is_some_and(|role| role != node.role) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                match serde_json::to_value(node) {
                    Ok(Value::Object(record)) => record
                        .values()
                        .filter_map(searchable_text)
                        .any(|text| text.to_lowercase().contains(&needle)),
                    _ => false,
                }
            }
        }
    }
}

/// Text of a scalar field value; keys and nulls are never searched
fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Resolved, deduplicated, ordered list of node ids a request targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    ids: Vec<String>,
    explicit: bool,
    /// Distinct ids the caller named, before filtering
    requested: usize,
}

impl CandidateSet {
    /// Candidate ids in dispatch order
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Whether the caller named the nodes instead of targeting all of them
    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// The caller named exactly one node and it survived filtering
    #[must_use]
    pub fn is_single_target(&self) -> bool {
        self.explicit && self.requested == 1 && self.ids.len() == 1
    }

    /// Position of a node id inside the candidate order
    #[must_use]
    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == node_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Split a comma-separated `nodes_list` value
///
/// Blank entries are skipped; `None` when nothing remains.
#[must_use]
pub fn parse_nodes_list(raw: &str) -> Option<Vec<String>> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!ids.is_empty()).then_some(ids)
}

/// Resolves node filters against a topology snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeSetResolver;

impl NodeSetResolver {
    /// Expand the requested ids (or every node when `None`) into candidates
    ///
    /// Explicit lists keep the caller's order and drop repeats. Ids unknown to
    /// the topology pass through untouched so they can be reported as failures
    /// later; the filter only removes nodes it can prove do not match.
    #[must_use]
    pub fn resolve(
        topology: &Topology,
        requested: Option<&[String]>,
        filter: &NodeFilter,
    ) -> CandidateSet {
        match requested {
            None => CandidateSet {
                ids: topology
                    .nodes()
                    .iter()
                    .filter(|n| filter.matches(n))
                    .map(|n| n.id.clone())
                    .collect(),
                explicit: false,
                requested: 0,
            },
            Some(requested) => {
                let mut seen = HashSet::new();
                let distinct: Vec<&String> =
                    requested.iter().filter(|id| seen.insert(*id)).collect();
                let ids = distinct
                    .iter()
                    .filter(|id| topology.get(id).is_none_or(|n| filter.matches(n)))
                    .map(|id| (*id).clone())
                    .collect();
                CandidateSet {
                    ids,
                    explicit: true,
                    requested: distinct.len(),
                }
            }
        }
    }
}
