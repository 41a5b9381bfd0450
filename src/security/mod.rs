//! Caller identity and per-node authorization

pub mod auth;
pub mod cache;
pub mod policy;

use serde::{Deserialize, Serialize};

pub use auth::{AuthConfig, Authenticator, TokenClaims};
pub use cache::CachedPermissionResolver;
pub use policy::{Action, Decision, Effect, PermissionResolver, RbacPolicy, RoleDefinition, Rule};

/// Authenticated identity making a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub name: String,
    pub roles: Vec<String>,
}

impl Caller {
    #[must_use]
    pub fn new(name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            roles,
        }
    }
}
