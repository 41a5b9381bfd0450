//! Health check endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Nodes in the current topology snapshot
    pub nodes: usize,
    /// When the topology snapshot was last replaced
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// Liveness probe - is the service running?
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let topology = state.gateway.registry().snapshot();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        nodes: topology.len(),
        last_refreshed: topology.refreshed_at(),
    })
}

/// Build health router (no authentication)
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/health", get(health))
}
