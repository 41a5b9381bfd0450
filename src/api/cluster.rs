//! Cluster endpoints
//!
//! Every handler turns path and query parameters into a `NodeRequest`, runs
//! it through the gateway and renders the envelope.

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::error::ApiError;
use crate::dispatch::{NodeRequest, Operation};
use crate::envelope::{SortSpec, parse_select};
use crate::gateway::GatewayResponse;
use crate::nodes::{NodeRole, parse_nodes_list};
use crate::security::Caller;

/// Path alias for the node the gateway runs on
const LOCAL_ALIAS: &str = "local";

/// Query parameters shared by all cluster endpoints
///
/// Values are taken as strings so malformed input can be reported with the
/// gateway's own error code instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ClusterQuery {
    pub nodes_list: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub section: Option<String>,
    pub field: Option<String>,
    pub sort: Option<String>,
    pub select: Option<String>,
    pub search: Option<String>,
    pub wait_for_complete: Option<String>,
    pub pretty: Option<String>,
    /// Log filters forwarded to nodes
    pub level: Option<String>,
    pub tag: Option<String>,
}

fn parse_bool(name: &str, raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(ApiError::invalid_parameter(format!(
            "{name} must be true or false, got '{v}'"
        ))),
    }
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>, ApiError> {
    raw.map(|v| {
        v.trim().parse::<usize>().map_err(|_| {
            ApiError::invalid_parameter(format!("{name} must be a non-negative integer, got '{v}'"))
        })
    })
    .transpose()
}

impl ClusterQuery {
    fn pretty(&self) -> Result<bool, ApiError> {
        parse_bool("pretty", self.pretty.as_deref())
    }

    /// Node ids from `nodes_list`; `*` means every node
    fn node_ids(&self) -> Option<Vec<String>> {
        self.nodes_list
            .as_deref()
            .and_then(parse_nodes_list)
            .filter(|ids| !ids.iter().any(|id| id == "*"))
    }

    /// Build the gateway request for `operation`
    fn into_request(
        self,
        caller: Caller,
        operation: Operation,
        node_ids: Option<Vec<String>>,
    ) -> Result<NodeRequest, ApiError> {
        let mut request = NodeRequest::new(caller, operation, node_ids);

        request.filter.role = self
            .node_type
            .as_deref()
            .map(str::parse::<NodeRole>)
            .transpose()?;

        if let Some(search) = self.search.filter(|s| !s.trim().is_empty()) {
            if operation != Operation::List {
                return Err(ApiError::invalid_parameter(
                    "search is only supported when listing nodes",
                ));
            }
            request.filter.search = Some(search);
        }

        request.query.offset = parse_count("offset", self.offset.as_deref())?.unwrap_or(0);
        request.query.limit = parse_count("limit", self.limit.as_deref())?;
        request.query.sort = self.sort.as_deref().map(SortSpec::parse).transpose()?;
        request.query.select = self.select.as_deref().and_then(parse_select);
        request.wait_for_complete =
            parse_bool("wait_for_complete", self.wait_for_complete.as_deref())?;

        request.params.section = self.section;
        request.params.field = self.field;
        if let Some(level) = self.level {
            request.params.filters.insert("level".to_string(), level);
        }
        if let Some(tag) = self.tag {
            request.params.filters.insert("tag".to_string(), tag);
        }

        Ok(request)
    }
}

/// Serialize a JSON body, indented when `pretty` is set
fn json_response(status: StatusCode, body: &impl Serialize, pretty: bool) -> Response {
    let bytes = if pretty {
        serde_json::to_vec_pretty(body)
    } else {
        serde_json::to_vec(body)
    };
    match bytes {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(e) => ApiError::from(crate::Error::from(e)).into_response(),
    }
}

/// Run a request through the gateway and render the outcome
async fn respond(state: &ApiState, request: NodeRequest, pretty: bool) -> Result<Response, ApiError> {
    match state.gateway.execute(request).await? {
        GatewayResponse::Envelope(body) => Ok(json_response(StatusCode::OK, &body, pretty)),
        GatewayResponse::Denied(_) => Err(ApiError::permission_denied()),
    }
}

/// Handle requests spanning `nodes_list` (or every node)
async fn run_cluster_wide(
    state: &ApiState,
    caller: Caller,
    operation: Operation,
    query: ClusterQuery,
) -> Result<Response, ApiError> {
    let pretty = query.pretty()?;
    let node_ids = query.node_ids();
    let request = query.into_request(caller, operation, node_ids)?;
    respond(state, request, pretty).await
}

/// Handle requests addressed to a single node in the path
async fn run_single_node(
    state: &ApiState,
    caller: Caller,
    operation: Operation,
    node_id: String,
    query: ClusterQuery,
) -> Result<Response, ApiError> {
    let pretty = query.pretty()?;
    let node_id = state.resolve_node_alias(node_id)?;
    let request = query.into_request(caller, operation, Some(vec![node_id]))?;
    respond(state, request, pretty).await
}

async fn healthcheck(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_cluster_wide(&state, caller, Operation::Health, query).await
}

async fn list_nodes(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_cluster_wide(&state, caller, Operation::List, query).await
}

async fn status(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_cluster_wide(&state, caller, Operation::Status, query).await
}

async fn validate_configuration(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_cluster_wide(&state, caller, Operation::ValidateConfig, query).await
}

async fn restart(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_cluster_wide(&state, caller, Operation::Restart, query).await
}

async fn node_status(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Path(node_id): Path<String>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_single_node(&state, caller, Operation::Status, node_id, query).await
}

async fn node_info(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Path(node_id): Path<String>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_single_node(&state, caller, Operation::GetInfo, node_id, query).await
}

async fn node_configuration(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Path(node_id): Path<String>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_single_node(&state, caller, Operation::GetConfig, node_id, query).await
}

async fn update_node_configuration(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Path(node_id): Path<String>,
    Query(query): Query<ClusterQuery>,
    body: String,
) -> Result<Response, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::invalid_parameter("configuration body is empty"));
    }

    let pretty = query.pretty()?;
    let node_id = state.resolve_node_alias(node_id)?;
    let mut request = query.into_request(caller, Operation::PutConfig, Some(vec![node_id]))?;
    request.params.body = Some(body);
    respond(&state, request, pretty).await
}

async fn node_logs(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Path(node_id): Path<String>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_single_node(&state, caller, Operation::GetLogs, node_id, query).await
}

async fn node_logs_summary(
    State(state): State<Arc<ApiState>>,
    Extension(caller): Extension<Caller>,
    Path(node_id): Path<String>,
    Query(query): Query<ClusterQuery>,
) -> Result<Response, ApiError> {
    run_single_node(&state, caller, Operation::GetLogsSummary, node_id, query).await
}

/// Build cluster router (requires an authenticated caller extension)
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/cluster/healthcheck", get(healthcheck))
        .route("/cluster/nodes", get(list_nodes))
        .route("/cluster/status", get(status))
        .route("/cluster/configuration/validation", get(validate_configuration))
        .route("/cluster/restart", put(restart))
        .route("/cluster/{node_id}/status", get(node_status))
        .route("/cluster/{node_id}/info", get(node_info))
        .route(
            "/cluster/{node_id}/configuration",
            get(node_configuration).put(update_node_configuration),
        )
        .route("/cluster/{node_id}/logs", get(node_logs))
        .route("/cluster/{node_id}/logs/summary", get(node_logs_summary))
}

impl ApiState {
    /// Map the `local` path alias to the configured local node
    fn resolve_node_alias(&self, node_id: String) -> Result<String, ApiError> {
        if node_id != LOCAL_ALIAS {
            return Ok(node_id);
        }
        self.local_node
            .clone()
            .ok_or_else(|| ApiError::invalid_parameter("no local node is configured"))
    }
}
