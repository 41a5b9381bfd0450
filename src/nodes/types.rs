//! Cluster topology types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Role of a node inside the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Master,
    Worker,
}

impl NodeRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(Self::Master),
            "worker" => Ok(Self::Worker),
            other => Err(Error::InvalidParameter(format!(
                "type must be 'master' or 'worker', got '{other}'"
            ))),
        }
    }
}

/// A member of the monitored cluster
///
/// Serialized with the field names clients see in node listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "name")]
    pub id: String,
    #[serde(rename = "type")]
    pub role: NodeRole,
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "active_agents")]
    pub active_agent_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_keep_alive: Option<chrono::DateTime<chrono::Utc>>,
}

impl Node {
    /// Create a node with no version or agent information yet
    #[must_use]
    pub fn new(id: impl Into<String>, role: NodeRole, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            address: address.into(),
            version: String::new(),
            active_agent_count: 0,
            last_keep_alive: None,
        }
    }

    #[must_use]
    pub fn is_master(&self) -> bool {
        self.role == NodeRole::Master
    }
}
