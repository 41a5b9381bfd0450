//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use cluster_gateway::api::ApiServerBuilder;
use cluster_gateway::dispatch::{
    DispatchSettings, Operation, OperationParams, RemoteError, RemoteNodeClient,
};
use cluster_gateway::security::{Action, AuthConfig, Authenticator, Decision, TokenClaims};
use cluster_gateway::{
    Caller, DispatchCoordinator, ErrorCode, Gateway, Node, NodeRegistry, NodeRole,
    PermissionResolver,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::SecretString;
use serde_json::{Value, json};

pub const SECRET: &str = "integration-test-secret";

/// What a fake node does when invoked
#[derive(Clone)]
pub enum NodeBehavior {
    Reply(Value),
    Fail(ErrorCode, &'static str),
    Hang(Duration),
}

/// Node transport answering from a table, recording every call
#[derive(Default)]
pub struct FakeNodeClient {
    behaviors: HashMap<String, NodeBehavior>,
    pub calls: Mutex<Vec<(String, Operation, OperationParams)>>,
}

impl FakeNodeClient {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, node_id: &str, behavior: NodeBehavior) -> Self {
        self.behaviors.insert(node_id.to_string(), behavior);
        self
    }

    pub fn called_nodes(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteNodeClient for FakeNodeClient {
    async fn execute(
        &self,
        node: &Node,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<Value, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push((node.id.clone(), operation, params.clone()));

        match self.behaviors.get(&node.id) {
            Some(NodeBehavior::Reply(value)) => Ok(value.clone()),
            Some(NodeBehavior::Fail(code, message)) => Err(RemoteError::new(*code, *message)),
            Some(NodeBehavior::Hang(duration)) => {
                tokio::time::sleep(*duration).await;
                Ok(json!({"status": "late"}))
            }
            None => Ok(json!({"status": "running"})),
        }
    }
}

/// Allows everything except the listed (caller, node) pairs
#[derive(Default)]
pub struct TablePolicy {
    denied: HashSet<(String, String)>,
}

impl TablePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn deny(mut self, caller: &str, node_id: &str) -> Self {
        self.denied.insert((caller.to_string(), node_id.to_string()));
        self
    }
}

#[async_trait]
impl PermissionResolver for TablePolicy {
    async fn check(
        &self,
        caller: &Caller,
        node_id: &str,
        _action: Action,
    ) -> cluster_gateway::Result<Decision> {
        if self
            .denied
            .contains(&(caller.name.clone(), node_id.to_string()))
        {
            Ok(Decision::Deny(format!("{} may not access {node_id}", caller.name)))
        } else {
            Ok(Decision::Allow)
        }
    }
}

pub fn master() -> Node {
    Node::new("master-node", NodeRole::Master, "10.0.0.1")
}

pub fn worker(name: &str, ip: &str) -> Node {
    Node::new(name, NodeRole::Worker, ip)
}

/// Sign a token for `sub` with the given roles
pub fn token(sub: &str, roles: &[&str]) -> String {
    let exp = u64::try_from(chrono::Utc::now().timestamp() + 3600).unwrap();
    let claims = TokenClaims {
        sub: sub.to_string(),
        roles: roles.iter().map(|r| (*r).to_string()).collect(),
        exp,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// Build the full router over the given topology and collaborators
pub fn build_app(
    nodes: Vec<Node>,
    permissions: Arc<dyn PermissionResolver>,
    client: Arc<dyn RemoteNodeClient>,
    settings: DispatchSettings,
) -> axum::Router {
    build_app_with_budget(nodes, permissions, client, settings, None)
}

/// Same as [`build_app`] with an optional requests-per-minute cap
pub fn build_app_with_budget(
    nodes: Vec<Node>,
    permissions: Arc<dyn PermissionResolver>,
    client: Arc<dyn RemoteNodeClient>,
    settings: DispatchSettings,
    rate_limit_rpm: Option<u32>,
) -> axum::Router {
    let coordinator = DispatchCoordinator::new(
        Arc::new(NodeRegistry::with_nodes(nodes)),
        permissions,
        client,
        settings,
    );
    let gateway = Arc::new(Gateway::new(coordinator, 500));
    let authenticator = Authenticator::new(&AuthConfig {
        jwt_secret: Some(SecretString::from(SECRET.to_string())),
        issuer: None,
        allow_anonymous: false,
    });

    ApiServerBuilder::new(gateway, authenticator)
        .local_node(Some("master-node".to_string()))
        .rate_limit_rpm(rate_limit_rpm)
        .build()
        .router()
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn put(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
