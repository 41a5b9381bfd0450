//! Authorize-then-invoke fan-out across candidate nodes

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;

use super::client::RemoteNodeClient;
use super::operation::{DispatchMode, NodeRequest, Operation, OperationParams};
use super::outcome::{PerNodeOutcome, RemoteError};
use crate::error::ErrorCode;
use crate::nodes::{CandidateSet, Node, NodeRegistry, NodeSetResolver, Topology};
use crate::security::{Caller, Decision, PermissionResolver};

/// Limits applied while fanning out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Maximum nodes contacted at once per request
    pub max_concurrency: usize,
    /// Budget for permission check plus remote call, per node
    pub node_timeout: Duration,
    /// Budget for the whole fan-out unless `wait_for_complete` is set
    pub request_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            node_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Candidates together with one outcome per candidate, in candidate order
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub candidates: CandidateSet,
    pub outcomes: Vec<PerNodeOutcome>,
}

/// Orchestrates per-node authorization and invocation
pub struct DispatchCoordinator {
    registry: Arc<NodeRegistry>,
    permissions: Arc<dyn PermissionResolver>,
    client: Arc<dyn RemoteNodeClient>,
    settings: DispatchSettings,
}

impl DispatchCoordinator {
    #[must_use]
    pub fn new(
        registry: Arc<NodeRegistry>,
        permissions: Arc<dyn PermissionResolver>,
        client: Arc<dyn RemoteNodeClient>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            permissions,
            client,
            settings,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Resolve candidates and collect exactly one outcome for each
    ///
    /// Individual node failures never abort the request. If the request
    /// deadline passes, nodes still pending are cancelled and reported with
    /// the request timeout code.
    pub async fn dispatch(&self, request: &NodeRequest) -> Dispatched {
        let topology = self.registry.snapshot();
        let candidates = NodeSetResolver::resolve(
            &topology,
            request.requested_node_ids.as_deref(),
            &request.filter,
        );

        if candidates.is_empty() {
            tracing::debug!(operation = %request.operation, "no candidate nodes");
            return Dispatched {
                candidates,
                outcomes: Vec::new(),
            };
        }

        let mut slots: Vec<Option<PerNodeOutcome>> = vec![None; candidates.len()];
        let deadline =
            (!request.wait_for_complete).then(|| Instant::now() + self.settings.request_timeout);

        {
            let topology = &topology;
            // Ids are owned so the stream stays `Send` inside spawned handler futures
            let mut pending = futures::stream::iter(candidates.ids().to_vec().into_iter().enumerate())
                .map(|(idx, node_id)| async move {
                    let outcome = self.run_node(topology, request, &node_id).await;
                    (idx, outcome)
                })
                .buffer_unordered(self.settings.max_concurrency.max(1));

            loop {
                let next = match deadline {
                    Some(deadline) => {
                        if let Ok(next) = tokio::time::timeout_at(deadline, pending.next()).await {
                            next
                        } else {
                            tracing::warn!(
                                operation = %request.operation,
                                pending = slots.iter().filter(|s| s.is_none()).count(),
                                "request deadline reached, cancelling pending nodes"
                            );
                            break;
                        }
                    }
                    None => pending.next().await,
                };
                let Some((idx, outcome)) = next else {
                    break;
                };
                slots[idx] = Some(outcome);
            }
        }

        let outcomes: Vec<PerNodeOutcome> = slots
            .into_iter()
            .zip(candidates.ids())
            .map(|(slot, node_id)| {
                slot.unwrap_or_else(|| {
                    PerNodeOutcome::failure(
                        node_id,
                        RemoteError::new(
                            ErrorCode::REQUEST_TIMEOUT,
                            ErrorCode::REQUEST_TIMEOUT.message(),
                        ),
                    )
                })
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.code().is_some()).count();
        tracing::info!(
            operation = %request.operation,
            caller = %request.caller.name,
            candidates = candidates.len(),
            failed,
            "dispatch finished"
        );

        Dispatched {
            candidates,
            outcomes,
        }
    }

    /// Authorize and run the operation on one node within the node budget
    async fn run_node(&self, topology: &Topology, request: &NodeRequest, node_id: &str) -> PerNodeOutcome {
        let work = self.authorize_and_invoke(
            topology,
            &request.caller,
            request.operation,
            &request.params,
            node_id,
        );

        if let Ok(outcome) = tokio::time::timeout(self.settings.node_timeout, work).await {
            outcome
        } else {
            tracing::warn!(node_id, operation = %request.operation, "node timed out");
            PerNodeOutcome::failure(
                node_id,
                RemoteError::new(ErrorCode::NODE_TIMEOUT, ErrorCode::NODE_TIMEOUT.message()),
            )
        }
    }

    async fn authorize_and_invoke(
        &self,
        topology: &Topology,
        caller: &Caller,
        operation: Operation,
        params: &OperationParams,
        node_id: &str,
    ) -> PerNodeOutcome {
        // Permission comes before existence so unknown ids cannot be probed
        match self.permissions.check(caller, node_id, operation.action()).await {
            Ok(Decision::Allow) => {}
            Ok(Decision::Deny(reason)) => {
                tracing::debug!(node_id, caller = %caller.name, %reason, "node denied");
                return PerNodeOutcome::Denied {
                    node_id: node_id.to_string(),
                    reason,
                };
            }
            Err(e) => {
                tracing::warn!(node_id, error = %e, "permission check failed");
                return PerNodeOutcome::failure(
                    node_id,
                    RemoteError::new(ErrorCode::INTERNAL, e.to_string()),
                );
            }
        }

        let Some(node) = topology.get(node_id) else {
            tracing::debug!(node_id, "node not in topology");
            return PerNodeOutcome::failure(
                node_id,
                RemoteError::new(ErrorCode::UNKNOWN_NODE, ErrorCode::UNKNOWN_NODE.message()),
            );
        };

        let result = match operation.mode() {
            DispatchMode::Local => local_payload(node, operation),
            DispatchMode::Distributed => self.client.execute(node, operation, params).await,
        };

        match result {
            Ok(payload) => PerNodeOutcome::Success {
                node_id: node_id.to_string(),
                payload,
            },
            Err(e) => {
                tracing::warn!(node_id, %operation, code = %e.code, error = %e.message, "node operation failed");
                PerNodeOutcome::failure(node_id, e)
            }
        }
    }
}

/// Payload for operations the gateway answers from its own registry
fn local_payload(node: &Node, operation: Operation) -> Result<serde_json::Value, RemoteError> {
    match operation {
        Operation::List => serde_json::to_value(node)
            .map_err(|e| RemoteError::new(ErrorCode::INTERNAL, e.to_string())),
        other => Err(RemoteError::new(
            ErrorCode::INTERNAL,
            format!("operation '{other}' cannot be answered locally"),
        )),
    }
}
