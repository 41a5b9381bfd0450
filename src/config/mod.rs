//! Configuration management for the cluster gateway
//!
//! Layers, lowest to highest: defaults, TOML file, `CLUSTER_GATEWAY_*`
//! environment variables. CLI flags are applied by the binary on top.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::dispatch::DispatchSettings;
use crate::nodes::Node;
use crate::security::{AuthConfig, RbacPolicy, RoleDefinition};
use crate::{Error, Result};

use file::GatewayConfigFile;

/// Prefix for all environment overrides
pub const ENV_PREFIX: &str = "CLUSTER_GATEWAY_";

/// Cluster gateway configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Token validation configuration
    pub auth: AuthConfig,

    /// Fan-out limits
    pub dispatch: DispatchConfig,

    /// Topology configuration
    pub cluster: ClusterConfig,

    /// Role definitions and decision caching
    pub rbac: RbacConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,

    /// Global requests per minute, unlimited when unset
    pub rate_limit_rpm: Option<u32>,
}

/// Fan-out limits
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub max_concurrency: usize,
    pub node_timeout: Duration,
    pub request_timeout: Duration,
    /// Largest accepted `limit` query parameter
    pub max_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let settings = DispatchSettings::default();
        Self {
            max_concurrency: settings.max_concurrency,
            node_timeout: settings.node_timeout,
            request_timeout: settings.request_timeout,
            max_limit: 500,
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub const fn settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_concurrency: self.max_concurrency,
            node_timeout: self.node_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

/// Topology configuration
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Node this gateway runs on, used for `/cluster/local/*`
    pub local_node: Option<String>,

    /// Static members, used when no topology file is configured
    pub nodes: Vec<Node>,

    /// TOML file re-read on each refresh
    pub topology_file: Option<PathBuf>,

    pub refresh_interval: Duration,
}

/// Role definitions and decision caching
#[derive(Debug, Clone)]
pub struct RbacConfig {
    /// Built-in roles followed by configured ones
    pub roles: Vec<RoleDefinition>,

    pub decision_cache_ttl: Duration,
}

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = file::load_config_file(path);
        Self::from_sources(file, |key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// `env` receives keys without the `CLUSTER_GATEWAY_` prefix.
    ///
    /// # Errors
    ///
    /// Returns error if an environment value does not parse or a limit is zero
    pub fn from_sources(file: GatewayConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse_env = |key: &str| -> Result<Option<u64>> {
            env(key)
                .map(|v| {
                    v.parse::<u64>()
                        .map_err(|e| Error::Config(format!("{ENV_PREFIX}{key}: {e}")))
                })
                .transpose()
        };

        let server = ServerConfig {
            bind: env("BIND")
                .or(file.server.bind)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match env("PORT") {
                Some(v) => v
                    .parse()
                    .map_err(|e| Error::Config(format!("{ENV_PREFIX}PORT: {e}")))?,
                None => file.server.port.unwrap_or(55000),
            },
            rate_limit_rpm: parse_env("RATE_LIMIT_RPM")?
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
                .or(file.server.rate_limit_rpm),
        };

        let auth = AuthConfig {
            jwt_secret: env("JWT_SECRET")
                .or(file.auth.jwt_secret)
                .map(SecretString::from),
            issuer: env("JWT_ISSUER").or(file.auth.issuer),
            allow_anonymous: env("ALLOW_ANONYMOUS")
                .map(|v| parse_flag(&v))
                .or(file.auth.allow_anonymous)
                .unwrap_or(false),
        };

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            max_concurrency: parse_env("MAX_CONCURRENCY")?
                .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
                .or(file.dispatch.max_concurrency)
                .unwrap_or(defaults.max_concurrency),
            node_timeout: parse_env("NODE_TIMEOUT_MS")?
                .or(file.dispatch.node_timeout_ms)
                .map_or(defaults.node_timeout, Duration::from_millis),
            request_timeout: parse_env("REQUEST_TIMEOUT_MS")?
                .or(file.dispatch.request_timeout_ms)
                .map_or(defaults.request_timeout, Duration::from_millis),
            max_limit: file.dispatch.max_limit.unwrap_or(defaults.max_limit),
        };

        if dispatch.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".to_string()));
        }
        if dispatch.node_timeout.is_zero() || dispatch.request_timeout.is_zero() {
            return Err(Error::Config("dispatch timeouts must be non-zero".to_string()));
        }
        if dispatch.max_limit == 0 {
            return Err(Error::Config("max_limit must be at least 1".to_string()));
        }

        let cluster = ClusterConfig {
            local_node: env("LOCAL_NODE").or(file.cluster.local_node),
            nodes: file.cluster.nodes,
            topology_file: env("TOPOLOGY_FILE")
                .or(file.cluster.topology_file)
                .map(PathBuf::from),
            refresh_interval: Duration::from_secs(
                parse_env("REFRESH_INTERVAL_SECS")?
                    .or(file.cluster.refresh_interval_secs)
                    .unwrap_or(30)
                    .max(1),
            ),
        };

        let mut roles = RbacPolicy::default_roles();
        roles.extend(file.rbac.roles);
        let rbac = RbacConfig {
            roles,
            decision_cache_ttl: Duration::from_secs(file.rbac.decision_cache_ttl_secs.unwrap_or(60)),
        };

        Ok(Self {
            server,
            auth,
            dispatch,
            cluster,
            rbac,
        })
    }
}
