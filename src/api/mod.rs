//! HTTP API server for the cluster gateway

mod auth;
pub mod cluster;
pub mod error;
pub mod health;
pub mod rate_limit;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::gateway::Gateway;
use crate::security::Authenticator;

pub use error::ApiError;

/// Shared state for API handlers
pub struct ApiState {
    pub gateway: Arc<Gateway>,
    pub authenticator: Authenticator,
    /// Node answering for the `local` path alias
    pub local_node: Option<String>,
    pub request_budget: Option<rate_limit::RequestBudget>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    gateway: Arc<Gateway>,
    authenticator: Authenticator,
    bind: String,
    port: u16,
    local_node: Option<String>,
    rate_limit_rpm: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(gateway: Arc<Gateway>, authenticator: Authenticator) -> Self {
        Self {
            gateway,
            authenticator,
            bind: "0.0.0.0".to_string(),
            port: 55000,
            local_node: None,
            rate_limit_rpm: None,
        }
    }

    /// Set the address to bind
    #[must_use]
    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Set the port to listen on
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the node answering for `/cluster/local/*`
    #[must_use]
    pub fn local_node(mut self, node: Option<String>) -> Self {
        self.local_node = node;
        self
    }

    /// Cap cluster requests per minute across all callers
    #[must_use]
    pub const fn rate_limit_rpm(mut self, rpm: Option<u32>) -> Self {
        self.rate_limit_rpm = rpm;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            gateway: self.gateway,
            authenticator: self.authenticator,
            local_node: self.local_node,
            request_budget: self.rate_limit_rpm.map(rate_limit::request_budget),
        });

        ApiServer {
            state,
            bind: self.bind,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    bind: String,
    port: u16,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let cluster = cluster::router().route_layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            auth::require_caller,
        ));

        let router = Router::new()
            .merge(cluster)
            .merge(health::router())
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit::enforce_request_budget,
            ))
            .with_state(self.state.clone());

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.bind, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(addr = %addr, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
