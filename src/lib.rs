//! Cluster Gateway - authorization-aware fan-out for cluster management APIs
//!
//! This library provides the core of the gateway:
//! - Node topology and node-set resolution
//! - Per-node RBAC with cached decisions
//! - Bounded concurrent dispatch with per-node and request deadlines
//! - Aggregation into a uniform partial-failure envelope
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     HTTP API                        │
//! │   auth  │  rate limit  │  /cluster/*  │  /health    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ NodeRequest
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Gateway                         │
//! │  resolve nodes │ authorize │ dispatch │ aggregate   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Cluster nodes                       │
//! │       master  │  worker  │  worker  │  ...          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod nodes;
pub mod security;

pub use config::Config;
pub use dispatch::{DispatchCoordinator, NodeRequest, Operation, PerNodeOutcome};
pub use envelope::{ApiResponse, ResultAggregator, ResultEnvelope};
pub use error::{Error, ErrorCode, Result};
pub use gateway::{Gateway, GatewayResponse};
pub use nodes::{Node, NodeRegistry, NodeRole, NodeSetResolver};
pub use security::{Caller, PermissionResolver};
