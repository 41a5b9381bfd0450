//! Built-in topology sources

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use super::TopologySource;
use crate::nodes::Node;
use crate::{Error, Result};

/// Fixed node list, usually taken from the config file
#[derive(Debug, Clone)]
pub struct StaticTopology {
    nodes: Vec<Node>,
}

impl StaticTopology {
    #[must_use]
    pub const fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl TopologySource for StaticTopology {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.clone())
    }
}

/// TOML document listing the cluster members
///
/// ```toml
/// [[nodes]]
/// name = "master-node"
/// type = "master"
/// ip = "10.0.0.1"
/// version = "4.3.0"
/// ```
#[derive(Debug, Default, Deserialize)]
struct TopologyFile {
    #[serde(default)]
    nodes: Vec<Node>,
}

/// Topology re-read from a TOML file on every refresh
///
/// Lets an external membership process rewrite the file without restarting
/// the gateway.
#[derive(Debug, Clone)]
pub struct FileTopology {
    path: PathBuf,
}

impl FileTopology {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TopologySource for FileTopology {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self) -> Result<Vec<Node>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Topology(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let file: TopologyFile = toml::from_str(&content)?;
        Ok(file.nodes)
    }
}
