//! Response envelope shared by every node-scoped operation

pub mod aggregator;
pub mod query;

use serde::{Deserialize, Serialize};

pub use aggregator::{FailedError, FailedItem, ResultAggregator, ResultEnvelope};
pub use query::{ListQuery, SortKey, SortSpec, parse_select};

use crate::dispatch::Operation;

/// Top-level body returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub data: ResultEnvelope,
    pub message: String,
    /// Number of failed nodes
    pub error: usize,
}

impl ApiResponse {
    #[must_use]
    pub fn new(operation: Operation, data: ResultEnvelope) -> Self {
        Self {
            message: data.message_for(operation).to_string(),
            error: data.total_failed_items,
            data,
        }
    }
}
