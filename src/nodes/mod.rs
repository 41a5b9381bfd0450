//! Cluster topology
//!
//! Nodes are the master and worker members of the monitored cluster.
//! The registry is fed by discovery; the resolver turns a request's node
//! filter into the ordered candidate set used for dispatch.

pub mod registry;
pub mod resolver;
pub mod types;

pub use registry::{NodeRegistry, Topology};
pub use resolver::{CandidateSet, NodeFilter, NodeSetResolver, parse_nodes_list};
pub use types::{Node, NodeRole};
