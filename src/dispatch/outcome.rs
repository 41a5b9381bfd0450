//! Result of running an operation on one node

use serde_json::Value;

use crate::error::ErrorCode;

/// Failure reported by a node or by the transport reaching it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
}

impl RemoteError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Exactly one of these exists per candidate node
#[derive(Debug, Clone, PartialEq)]
pub enum PerNodeOutcome {
    Success { node_id: String, payload: Value },
    Denied { node_id: String, reason: String },
    RemoteFailure { node_id: String, code: ErrorCode, message: String },
}

impl PerNodeOutcome {
    #[must_use]
    pub fn node_id(&self) -> &str {
        match self {
            Self::Success { node_id, .. }
            | Self::Denied { node_id, .. }
            | Self::RemoteFailure { node_id, .. } => node_id,
        }
    }

    /// Error code for failed outcomes, `None` on success
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Denied { .. } => Some(ErrorCode::PERMISSION_DENIED),
            Self::RemoteFailure { code, .. } => Some(*code),
        }
    }

    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    pub(crate) fn failure(node_id: &str, error: RemoteError) -> Self {
        Self::RemoteFailure {
            node_id: node_id.to_string(),
            code: error.code,
            message: error.message,
        }
    }
}
