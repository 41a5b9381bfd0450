//! Bearer token authentication middleware

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::ApiState;
use super::error::ApiError;

/// Extract bearer token from Authorization header
fn extract_bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware that resolves the caller and stores it as a request extension
pub async fn require_caller(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = state
        .authenticator
        .authenticate(extract_bearer(&req))
        .map_err(|e| {
            tracing::debug!(error = %e, "authentication failed");
            ApiError::from(e)
        })?;

    tracing::trace!(caller = %caller.name, "authenticated");
    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
