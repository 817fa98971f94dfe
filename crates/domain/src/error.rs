//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`RelayError`]
//! via `#[from]`. Handler failures have their own [`HandlerError`] because
//! the poller treats them as transient rather than propagating them.

use crate::capability::CapabilityKey;

/// Top-level error for use-cases and ports.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A domain invariant was violated.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("capability name must not be empty")]
    EmptyCapabilityName,
}

/// A lookup by identifier found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A unit references capabilities the registry cannot satisfy.
///
/// Fatal for the affected unit only; never retried automatically.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown action {0}")]
    UnknownAction(CapabilityKey),

    #[error("unknown reaction {0}")]
    UnknownReaction(CapabilityKey),

    #[error("capability {0} registered twice")]
    DuplicateCapability(CapabilityKey),
}

/// Failure inside an Action or Reaction handler.
///
/// The poller logs these, abandons the cycle and retries after a backoff.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("invalid options")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("no credential for service {service}")]
    MissingCredential { service: String },

    #[error("upstream returned status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("upstream request failed")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("state encoding failed")]
    State(#[from] crate::state::StateCodecError),
}

impl HandlerError {
    /// Wrap any upstream failure (HTTP client, credential lookup, …).
    pub fn upstream(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Upstream(Box::new(err))
    }
}
