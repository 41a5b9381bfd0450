//! Folding per-node outcomes into the response envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query::ListQuery;
use crate::dispatch::{ItemShape, Operation, PerNodeOutcome};
use crate::error::ErrorCode;
use crate::nodes::CandidateSet;

/// Error description shared by a failure group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedError {
    pub code: ErrorCode,
    pub message: String,
}

/// Node ids that failed with the same code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub error: FailedError,
    pub id: Vec<String>,
}

/// Uniform response body for node-scoped operations
///
/// `total_affected_items` counts every successful node, even those cut by
/// pagination; `total_failed_items` counts ids across all failure groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub affected_items: Vec<Value>,
    pub failed_items: Vec<FailedItem>,
    pub total_affected_items: usize,
    pub total_failed_items: usize,
}

impl ResultEnvelope {
    /// Response message for the operation given how many nodes failed
    #[must_use]
    pub const fn message_for(&self, operation: Operation) -> &'static str {
        let (all, some, none) = operation.messages();
        if self.total_failed_items == 0 {
            all
        } else if self.total_affected_items == 0 {
            none
        } else {
            some
        }
    }
}

/// Builds envelopes from outcome sets
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    /// Aggregate outcomes for a candidate set
    ///
    /// Deterministic for a given outcome set regardless of the order
    /// outcomes were produced in.
    #[must_use]
    pub fn aggregate(
        operation: Operation,
        candidates: &CandidateSet,
        mut outcomes: Vec<PerNodeOutcome>,
        query: &ListQuery,
    ) -> ResultEnvelope {
        outcomes.sort_by_key(|o| candidates.position(o.node_id()).unwrap_or(usize::MAX));

        let mut affected = Vec::new();
        let mut groups: Vec<FailedItem> = Vec::new();

        for outcome in outcomes {
            match outcome {
                PerNodeOutcome::Success { node_id, payload } => {
                    affected.push(shape_item(operation.item_shape(), node_id, payload));
                }
                PerNodeOutcome::Denied { node_id, .. } => {
                    push_failure(&mut groups, ErrorCode::PERMISSION_DENIED, node_id);
                }
                PerNodeOutcome::RemoteFailure { node_id, code, .. } => {
                    push_failure(&mut groups, code, node_id);
                }
            }
        }

        if let Some(sort) = query.sort.clone().or_else(|| operation.default_sort()) {
            sort.apply(&mut affected);
        }

        let total_affected_items = affected.len();
        let total_failed_items = groups.iter().map(|g| g.id.len()).sum();

        query.project(&mut affected);
        let affected_items = query.paginate(affected);

        ResultEnvelope {
            affected_items,
            failed_items: groups,
            total_affected_items,
            total_failed_items,
        }
    }
}

/// Add a node to its code's group, opening the group on first sight
fn push_failure(groups: &mut Vec<FailedItem>, code: ErrorCode, node_id: String) {
    if let Some(group) = groups.iter_mut().find(|g| g.error.code == code) {
        group.id.push(node_id);
    } else {
        groups.push(FailedItem {
            error: FailedError {
                code,
                message: code.message().to_string(),
            },
            id: vec![node_id],
        });
    }
}

fn shape_item(shape: ItemShape, node_id: String, payload: Value) -> Value {
    match (shape, payload) {
        (ItemShape::NodeId, _) => Value::String(node_id),
        (ItemShape::Record, Value::Object(mut map)) => {
            map.entry("name").or_insert(Value::String(node_id));
            Value::Object(map)
        }
        (ItemShape::Record, Value::Null) => serde_json::json!({ "name": node_id }),
        (ItemShape::Record, other) => serde_json::json!({ "name": node_id, "data": other }),
    }
}
