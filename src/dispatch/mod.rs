//! Fan-out of node-scoped operations
//!
//! Each candidate node is authorized, then invoked through the node
//! transport (or answered locally), yielding one outcome per node.

pub mod client;
pub mod coordinator;
pub mod operation;
pub mod outcome;

pub use client::{HttpNodeClient, RemoteNodeClient};
pub use coordinator::{DispatchCoordinator, DispatchSettings, Dispatched};
pub use operation::{DispatchMode, ItemShape, NodeRequest, Operation, OperationParams};
pub use outcome::{PerNodeOutcome, RemoteError};
