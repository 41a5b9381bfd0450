//! Node-scoped operations and their dispatch properties

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::envelope::{ListQuery, SortSpec};
use crate::nodes::NodeFilter;
use crate::security::{Action, Caller};

/// Operation requested for every candidate node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Health,
    List,
    Status,
    GetConfig,
    GetInfo,
    GetLogs,
    GetLogsSummary,
    Restart,
    PutConfig,
    ValidateConfig,
}

/// Where an operation is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Answered by the gateway from its registry
    Local,
    /// Sent to each node over the node transport
    Distributed,
}

/// How a successful node shows up in `affected_items`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    /// The node's payload, tagged with its `name`
    Record,
    /// Just the node id
    NodeId,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::List => "list",
            Self::Status => "status",
            Self::GetConfig => "get_config",
            Self::GetInfo => "get_info",
            Self::GetLogs => "get_logs",
            Self::GetLogsSummary => "get_logs_summary",
            Self::Restart => "restart",
            Self::PutConfig => "put_config",
            Self::ValidateConfig => "validate_config",
        }
    }

    /// RBAC action checked on each node
    #[must_use]
    pub const fn action(self) -> Action {
        match self {
            Self::Health | Self::List | Self::Status | Self::GetInfo => Action::Read,
            Self::GetConfig | Self::ValidateConfig => Action::ReadConfig,
            Self::GetLogs | Self::GetLogsSummary => Action::ReadLogs,
            Self::Restart => Action::Restart,
            Self::PutConfig => Action::UpdateConfig,
        }
    }

    #[must_use]
    pub const fn mode(self) -> DispatchMode {
        match self {
            Self::List => DispatchMode::Local,
            _ => DispatchMode::Distributed,
        }
    }

    /// Whether the operation changes node state
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Restart | Self::PutConfig)
    }

    #[must_use]
    pub const fn item_shape(self) -> ItemShape {
        if self.is_write() {
            ItemShape::NodeId
        } else {
            ItemShape::Record
        }
    }

    /// Sort applied when the caller gives none
    #[must_use]
    pub fn default_sort(self) -> Option<SortSpec> {
        match self {
            Self::List => Some(SortSpec::ascending(&["type", "name"])),
            _ => None,
        }
    }

    /// Response messages for (all succeeded, some failed, none succeeded)
    #[must_use]
    pub const fn messages(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Health => (
                "All selected nodes healthcheck information was returned",
                "Some nodes healthcheck information was not returned",
                "No healthcheck information was returned",
            ),
            Self::List => (
                "All selected nodes information was returned",
                "Some nodes information was not returned",
                "No node information was returned",
            ),
            Self::Status => (
                "All selected nodes status was returned",
                "Some nodes status was not returned",
                "No node status was returned",
            ),
            Self::GetConfig => (
                "All selected nodes configuration was returned",
                "Some nodes configuration was not returned",
                "No node configuration was returned",
            ),
            Self::GetInfo => (
                "All selected nodes basic information was returned",
                "Some nodes basic information was not returned",
                "No node basic information was returned",
            ),
            Self::GetLogs => (
                "Logs were successfully read",
                "Could not read logs in some nodes",
                "Could not read logs in any node",
            ),
            Self::GetLogsSummary => (
                "Log summary was successfully read",
                "Could not read log summary in some nodes",
                "Could not read log summary in any node",
            ),
            Self::Restart => (
                "Restart request sent to all specified nodes",
                "Restart request was not sent to some nodes",
                "Restart request was not sent to any node",
            ),
            Self::PutConfig => (
                "Configuration was successfully updated",
                "Configuration was not updated in some nodes",
                "Could not update configuration",
            ),
            Self::ValidateConfig => (
                "Validation was successfully checked in all nodes",
                "Validation could not be checked in some nodes",
                "Could not check validation in any node",
            ),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation-specific inputs forwarded to each node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    /// Configuration section (`get_config`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Field inside the section (`get_config`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Extra node-side filters, e.g. log `level` or `tag`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,

    /// Raw configuration document (`put_config`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A fully parsed request against a set of nodes
#[derive(Debug, Clone)]
pub struct NodeRequest {
    pub caller: Caller,
    pub operation: Operation,
    /// Explicit node ids; `None` targets every node
    pub requested_node_ids: Option<Vec<String>>,
    pub filter: NodeFilter,
    pub params: OperationParams,
    pub query: ListQuery,
    /// Disable the request-level deadline
    pub wait_for_complete: bool,
}

impl NodeRequest {
    /// Request with defaults for everything but caller, operation and nodes
    #[must_use]
    pub fn new(caller: Caller, operation: Operation, requested_node_ids: Option<Vec<String>>) -> Self {
        Self {
            caller,
            operation,
            requested_node_ids,
            filter: NodeFilter::default(),
            params: OperationParams::default(),
            query: ListQuery::default(),
            wait_for_complete: false,
        }
    }
}
