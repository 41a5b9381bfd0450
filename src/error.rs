//! Error types for the cluster gateway

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the cluster gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Request parameter rejected before dispatch
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Authentication error
    #[error("auth error: {0}")]
    Auth(String),

    /// Topology discovery error
    #[error("topology error: {0}")]
    Topology(String),

    /// Permission policy could not be evaluated
    #[error("policy error: {0}")]
    Policy(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Wire code reported to clients for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParameter(_) => ErrorCode::INVALID_PARAMETER,
            Self::Auth(_) => ErrorCode::AUTHENTICATION,
            _ => ErrorCode::INTERNAL,
        }
    }
}

/// Numeric error code carried in failed items and error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    /// Unexpected failure inside the gateway or on a node
    pub const INTERNAL: Self = Self(1000);
    /// Malformed request parameter
    pub const INVALID_PARAMETER: Self = Self(1400);
    /// A single node did not answer within the per-node timeout
    pub const NODE_TIMEOUT: Self = Self(3020);
    /// The whole request exceeded its deadline before the node resolved
    pub const REQUEST_TIMEOUT: Self = Self(3021);
    /// Node id is not part of the cluster topology
    pub const UNKNOWN_NODE: Self = Self(3022);
    /// Node is known but could not be reached
    pub const NODE_UNREACHABLE: Self = Self(3023);
    /// Caller is not allowed to run the action on the node
    pub const PERMISSION_DENIED: Self = Self(4000);
    /// Missing or invalid bearer token
    pub const AUTHENTICATION: Self = Self(6000);
    /// Global request budget for the current minute is spent
    pub const RATE_LIMITED: Self = Self(6001);

    /// Canonical human-readable description
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self.0 {
            1400 => "Invalid request parameter",
            3020 => "Timeout sending request to node",
            3021 => "Timeout executing API request",
            3022 => "Unknown node ID",
            3023 => "Node is not connected",
            4000 => "Permission denied: resource access forbidden",
            6000 => "Invalid credentials",
            6001 => "Maximum number of requests per minute reached",
            _ => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
