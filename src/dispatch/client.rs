//! Transport used to run an operation on a remote node

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operation::{Operation, OperationParams};
use super::outcome::RemoteError;
use crate::error::ErrorCode;
use crate::nodes::Node;

/// Path nodes expose for gateway-dispatched operations
pub const DISPATCH_PATH: &str = "/cluster/dispatch";

/// Runs one operation on one node
///
/// Retries, if any, belong to the implementation; the coordinator calls
/// each node exactly once per request.
#[async_trait]
pub trait RemoteNodeClient: Send + Sync {
    /// Execute the operation and return the node's payload
    ///
    /// # Errors
    ///
    /// Returns a `RemoteError` carrying the wire code to report for the node
    async fn execute(
        &self,
        node: &Node,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<Value, RemoteError>;
}

/// Body posted to a node
#[derive(Debug, Serialize)]
struct DispatchBody<'a> {
    operation: Operation,
    params: &'a OperationParams,
}

/// Reply expected from a node
#[derive(Debug, Deserialize)]
struct NodeReply {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP/JSON node transport
#[derive(Debug, Clone, Default)]
pub struct HttpNodeClient {
    client: reqwest::Client,
}

impl HttpNodeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL for a node address, adding a scheme when missing
    fn base_url(address: &str) -> String {
        if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        }
    }
}

fn map_transport_error(e: &reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::new(ErrorCode::NODE_TIMEOUT, e.to_string())
    } else if e.is_connect() {
        RemoteError::new(ErrorCode::NODE_UNREACHABLE, e.to_string())
    } else {
        RemoteError::new(ErrorCode::INTERNAL, e.to_string())
    }
}

fn interpret_reply(status: reqwest::StatusCode, reply: NodeReply) -> Result<Value, RemoteError> {
    match reply.error {
        Some(code) if code != 0 => Err(RemoteError::new(
            ErrorCode(code),
            reply
                .message
                .unwrap_or_else(|| ErrorCode(code).message().to_string()),
        )),
        _ if !status.is_success() => Err(RemoteError::new(
            ErrorCode::INTERNAL,
            format!("node answered with HTTP {status}"),
        )),
        _ => Ok(reply.data.unwrap_or(Value::Null)),
    }
}

#[async_trait]
impl RemoteNodeClient for HttpNodeClient {
    async fn execute(
        &self,
        node: &Node,
        operation: Operation,
        params: &OperationParams,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{DISPATCH_PATH}", Self::base_url(&node.address));
        tracing::debug!(node_id = %node.id, %operation, %url, "dispatching to node");

        let response = self
            .client
            .post(&url)
            .json(&DispatchBody { operation, params })
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        let reply: NodeReply = response
            .json()
            .await
            .map_err(|e| RemoteError::new(ErrorCode::INTERNAL, format!("invalid node reply: {e}")))?;

        interpret_reply(status, reply)
    }
}
