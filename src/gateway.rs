//! Request pipeline: resolve, dispatch, aggregate

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::Result;
use crate::dispatch::{DispatchCoordinator, NodeRequest};
use crate::envelope::{ApiResponse, ResultAggregator};
use crate::error::ErrorCode;
use crate::nodes::NodeRegistry;

/// What the HTTP layer should send back
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// Envelope with the per-node breakdown (HTTP 200)
    Envelope(ApiResponse),
    /// The one node the caller named was denied (HTTP 403)
    Denied(ErrorCode),
}

/// Entry point for node-scoped requests
pub struct Gateway {
    coordinator: DispatchCoordinator,
    max_limit: usize,
}

impl Gateway {
    #[must_use]
    pub const fn new(coordinator: DispatchCoordinator, max_limit: usize) -> Self {
        Self {
            coordinator,
            max_limit,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        self.coordinator.registry()
    }

    /// Run a request end to end
    ///
    /// A request that explicitly targets a single node which the caller may
    /// not touch is rejected as a whole; every other denial is folded into
    /// `failed_items`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` when listing controls are invalid
    pub async fn execute(&self, request: NodeRequest) -> Result<GatewayResponse> {
        request.query.validate(self.max_limit)?;

        let span = tracing::info_span!(
            "cluster_request",
            request_id = %Uuid::new_v4(),
            operation = %request.operation,
        );
        let dispatched = self.coordinator.dispatch(&request).instrument(span).await;

        if dispatched.candidates.is_single_target()
            && dispatched.outcomes.first().is_some_and(|o| o.is_denied())
        {
            tracing::info!(
                caller = %request.caller.name,
                node_id = %dispatched.candidates.ids()[0],
                operation = %request.operation,
                "single-node request denied"
            );
            return Ok(GatewayResponse::Denied(ErrorCode::PERMISSION_DENIED));
        }

        let envelope = ResultAggregator::aggregate(
            request.operation,
            &dispatched.candidates,
            dispatched.outcomes,
            &request.query,
        );

        Ok(GatewayResponse::Envelope(ApiResponse::new(request.operation, envelope)))
    }
}
