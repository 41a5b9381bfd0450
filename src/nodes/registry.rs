//! Node registry holding the current cluster topology
//!
//! The registry is read-mostly: request handlers take cheap snapshots while
//! the discovery loop swaps in a whole new topology on each refresh.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::types::{Node, NodeRole};

/// Immutable view of the topology at one point in time
///
/// Nodes are ordered master first, then workers in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Topology {
    /// Build a topology, putting masters ahead of workers and dropping
    /// repeated node ids (first occurrence wins)
    #[must_use]
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let (masters, workers): (Vec<Node>, Vec<Node>) = nodes
            .into_iter()
            .filter(|n| seen.insert(n.id.clone()))
            .partition(Node::is_master);

        Self {
            nodes: masters.into_iter().chain(workers).collect(),
            refreshed_at: Some(Utc::now()),
        }
    }

    /// Get a node by ID
    #[must_use]
    pub fn get(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// All nodes in registry order
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The first master node, if any
    #[must_use]
    pub fn master(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.role == NodeRole::Master)
    }

    /// When this topology was produced
    #[must_use]
    pub const fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Registry of known cluster nodes
#[derive(Debug, Default)]
pub struct NodeRegistry {
    current: RwLock<Arc<Topology>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with nodes
    #[must_use]
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            current: RwLock::new(Arc::new(Topology::new(nodes))),
        }
    }

    /// Current topology snapshot
    ///
    /// The snapshot stays valid for the whole request even if a refresh
    /// lands meanwhile.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Topology> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Replace the topology wholesale
    pub fn replace(&self, nodes: Vec<Node>) {
        let topology = Arc::new(Topology::new(nodes));
        let count = topology.len();
        match self.current.write() {
            Ok(mut guard) => *guard = topology,
            Err(poisoned) => *poisoned.into_inner() = topology,
        }
        tracing::debug!(nodes = count, "node registry replaced");
    }

    /// Get a copy of a node by ID
    #[must_use]
    pub fn get(&self, node_id: &str) -> Option<Node> {
        self.snapshot().get(node_id).cloned()
    }

    /// Number of known nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
