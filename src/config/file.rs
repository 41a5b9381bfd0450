//! TOML configuration file loading
//!
//! Supports `~/.config/cluster-gateway/config.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::nodes::Node;
use crate::security::RoleDefinition;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GatewayConfigFile {
    #[serde(default)]
    pub server: ServerFileConfig,

    #[serde(default)]
    pub auth: AuthFileConfig,

    #[serde(default)]
    pub dispatch: DispatchFileConfig,

    #[serde(default)]
    pub cluster: ClusterFileConfig,

    #[serde(default)]
    pub rbac: RbacFileConfig,
}

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Global request budget per minute
    pub rate_limit_rpm: Option<u32>,
}

/// Token validation configuration
#[derive(Debug, Default, Deserialize)]
pub struct AuthFileConfig {
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub allow_anonymous: Option<bool>,
}

/// Fan-out limits
#[derive(Debug, Default, Deserialize)]
pub struct DispatchFileConfig {
    pub max_concurrency: Option<usize>,
    pub node_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub max_limit: Option<usize>,
}

/// Cluster topology configuration
#[derive(Debug, Default, Deserialize)]
pub struct ClusterFileConfig {
    /// Name of the node this gateway runs on
    pub local_node: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    pub topology_file: Option<String>,
    pub refresh_interval_secs: Option<u64>,
}

/// Role definitions
#[derive(Debug, Default, Deserialize)]
pub struct RbacFileConfig {
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
    pub decision_cache_ttl_secs: Option<u64>,
}

/// Load the TOML config file from an explicit path or the standard one
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file(path: Option<&Path>) -> GatewayConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return GatewayConfigFile::default();
    };

    if !path.exists() {
        return GatewayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GatewayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/cluster-gateway/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("cluster-gateway").join("config.toml"))
}
