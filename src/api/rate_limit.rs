//! Gateway-wide request budget
//!
//! Every cluster request draws from one per-minute budget sized by
//! `server.rate_limit_rpm`, shared by all callers. Liveness checks on
//! `/health` never draw from it.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::NotKeyed};

use super::ApiState;
use super::error::ApiError;

/// Paths that bypass the budget
const EXEMPT_PATHS: &[&str] = &["/health"];

/// Per-minute budget shared by all cluster requests
pub type RequestBudget = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Budget refilling to `requests_per_minute`; zero is treated as one
#[must_use]
pub fn request_budget(requests_per_minute: u32) -> RequestBudget {
    let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(rpm)))
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
}

/// Reject with 429 / 6001 once the budget is spent
pub async fn enforce_request_budget(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(budget) = &state.request_budget else {
        return Ok(next.run(req).await);
    };
    if is_exempt(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    if budget.check().is_err() {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "request budget exhausted"
        );
        return Err(ApiError::rate_limited());
    }
    Ok(next.run(req).await)
}
