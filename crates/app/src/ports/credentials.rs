//! Credential port: per-user, per-service access tokens.
//!
//! Token issuance and refresh happen outside the engine (OAuth flows); the
//! store only hands out whatever token is currently on file.

use async_trait::async_trait;

use relay_domain::error::RelayError;
use relay_domain::id::UserId;
use relay_domain::time::Timestamp;

/// A bearer token for one user on one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<Timestamp>,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    /// Whether the token is past its expiry at `now`. Tokens without an
    /// expiry never expire.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Token store keyed by `(user, service)`.
///
/// Object safe so handlers can receive it behind an `Arc<dyn _>`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the token `user` granted for `service`.
    async fn access_token(
        &self,
        user: UserId,
        service: &str,
    ) -> Result<Option<AccessToken>, RelayError>;
}

/// A store that never has a token; for deployments without OAuth services.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

#[async_trait]
impl CredentialStore for NoCredentials {
    async fn access_token(
        &self,
        _user: UserId,
        _service: &str,
    ) -> Result<Option<AccessToken>, RelayError> {
        Ok(None)
    }
}
