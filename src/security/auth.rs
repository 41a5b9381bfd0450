//! Bearer token authentication
//!
//! Tokens are HS256 JWTs minted elsewhere; the gateway only validates them
//! and turns the claims into a `Caller`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::Caller;
use crate::{Error, Result};

/// Name given to callers when anonymous access is enabled
pub const ANONYMOUS_CALLER: &str = "anonymous";

/// Authentication settings
#[derive(Debug, Default)]
pub struct AuthConfig {
    /// Shared HS256 secret used to verify tokens
    pub jwt_secret: Option<SecretString>,

    /// Required `iss` claim, if any
    pub issuer: Option<String>,

    /// Accept requests without a token as an administrator (development only)
    pub allow_anonymous: bool,
}

/// Claims carried by caller tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Validates bearer tokens
#[derive(Clone)]
pub struct Authenticator {
    key: Option<DecodingKey>,
    validation: Validation,
    allow_anonymous: bool,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("allow_anonymous", &self.allow_anonymous)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let key = config
            .jwt_secret
            .as_ref()
            .map(|secret| DecodingKey::from_secret(secret.expose_secret().as_bytes()));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Tokens are not scoped to an audience
        validation.validate_aud = false;
        validation.required_spec_claims.remove("aud");
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if key.is_none() && config.allow_anonymous {
            tracing::warn!("no token secret configured - allowing anonymous administrator access");
        }

        Self {
            key,
            validation,
            allow_anonymous: config.allow_anonymous,
        }
    }

    /// Resolve the caller behind an optional bearer token
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` for missing, malformed, expired or wrongly
    /// signed tokens
    pub fn authenticate(&self, token: Option<&str>) -> Result<Caller> {
        let Some(key) = &self.key else {
            return if self.allow_anonymous {
                Ok(Caller::new(ANONYMOUS_CALLER, vec!["administrator".to_string()]))
            } else {
                Err(Error::Auth("token authentication is not configured".to_string()))
            };
        };

        let token = token.ok_or_else(|| Error::Auth("missing bearer token".to_string()))?;
        let data = decode::<TokenClaims>(token, key, &self.validation)
            .map_err(|e| Error::Auth(format!("invalid token: {e}")))?;

        Ok(Caller::new(data.claims.sub, data.claims.roles))
    }
}
