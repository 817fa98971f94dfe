//! Capability port: the contract between the engine and Action/Reaction
//! implementations.
//!
//! The engine talks to handlers only through the object-safe
//! [`ActionHandler`] and [`ReactionHandler`] traits: options are an opaque
//! JSON payload and the action state is an opaque [`StateBlob`].
//!
//! Most integrations implement the typed [`JsonAction`] / [`JsonReaction`]
//! traits instead and register them through [`action`] / [`reaction`]. The
//! wrappers decode options, decode state through the state codec (falling
//! back to the handler's explicit `default_state()`), and re-encode the new
//! state, so every handler follows the same "reinitialize on mismatch" rule.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned};

use relay_domain::capability::CapabilityInfo;
use relay_domain::error::HandlerError;
use relay_domain::id::{UnitId, UserId};
use relay_domain::state::{self, Decoded, StateBlob};

use crate::ports::credentials::{AccessToken, CredentialStore};

/// Everything a handler may know about the unit it runs for.
#[derive(Clone)]
pub struct HandlerContext {
    pub unit_id: UnitId,
    pub owner: UserId,
    credentials: Arc<dyn CredentialStore>,
}

impl HandlerContext {
    #[must_use]
    pub fn new(unit_id: UnitId, owner: UserId, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            unit_id,
            owner,
            credentials,
        }
    }

    /// Fetch the owner's token for `service`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::MissingCredential`] if no valid token is on
    /// file, or [`HandlerError::Upstream`] if the store itself failed.
    pub async fn access_token(&self, service: &str) -> Result<AccessToken, HandlerError> {
        match self.credentials.access_token(self.owner, service).await {
            Ok(Some(token)) if !token.is_expired(relay_domain::time::now()) => Ok(token),
            Ok(_) => Err(HandlerError::MissingCredential {
                service: service.to_string(),
            }),
            Err(err) => Err(HandlerError::upstream(err)),
        }
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("unit_id", &self.unit_id)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// What one Action invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The fact handed to the Reaction; `Some` means the Action fired.
    pub fact: Option<String>,
    /// The state to persist for the next cycle.
    pub state: StateBlob,
}

impl ActionOutcome {
    #[must_use]
    pub fn idle(state: StateBlob) -> Self {
        Self { fact: None, state }
    }

    #[must_use]
    pub fn fired(fact: impl Into<String>, state: StateBlob) -> Self {
        Self {
            fact: Some(fact.into()),
            state,
        }
    }

    #[must_use]
    pub fn triggered(&self) -> bool {
        self.fact.is_some()
    }
}

/// A condition check the engine polls.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn info(&self) -> &CapabilityInfo;

    /// Evaluate the condition once.
    ///
    /// All external IO happens in here, bounded by the handler's own timeouts.
    async fn poll(
        &self,
        ctx: &HandlerContext,
        options: &serde_json::Value,
        state: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError>;
}

/// A side effect the engine runs when the paired Action fires.
#[async_trait]
pub trait ReactionHandler: Send + Sync {
    fn info(&self) -> &CapabilityInfo;

    /// Perform the side effect for `fact`, returning a user-visible message.
    async fn react(
        &self,
        ctx: &HandlerContext,
        options: &serde_json::Value,
        fact: &str,
    ) -> Result<String, HandlerError>;
}

/// Typed result of a [`JsonAction`] evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<S> {
    pub fact: Option<String>,
    pub state: S,
}

impl<S> Evaluation<S> {
    #[must_use]
    pub fn idle(state: S) -> Self {
        Self { fact: None, state }
    }

    #[must_use]
    pub fn fired(fact: impl Into<String>, state: S) -> Self {
        Self {
            fact: Some(fact.into()),
            state,
        }
    }
}

/// An Action with JSON options and JSON state.
#[async_trait]
pub trait JsonAction: Send + Sync + 'static {
    type Options: DeserializeOwned + Send;
    type State: Serialize + DeserializeOwned + Send;

    fn info(&self) -> CapabilityInfo;

    /// State used on the first run, and whenever the stored blob does not
    /// match [`Self::State`].
    fn default_state(&self) -> Self::State;

    async fn evaluate(
        &self,
        ctx: &HandlerContext,
        options: Self::Options,
        state: Self::State,
    ) -> Result<Evaluation<Self::State>, HandlerError>;
}

/// A Reaction with JSON options.
#[async_trait]
pub trait JsonReaction: Send + Sync + 'static {
    type Options: DeserializeOwned + Send;

    fn info(&self) -> CapabilityInfo;

    async fn execute(
        &self,
        ctx: &HandlerContext,
        options: Self::Options,
        fact: &str,
    ) -> Result<String, HandlerError>;
}

/// Wrap a [`JsonAction`] for registration.
pub fn action<A: JsonAction>(handler: A) -> Arc<dyn ActionHandler> {
    let info = handler.info();
    Arc::new(TypedAction { handler, info })
}

/// Wrap a [`JsonReaction`] for registration.
pub fn reaction<R: JsonReaction>(handler: R) -> Arc<dyn ReactionHandler> {
    let info = handler.info();
    Arc::new(TypedReaction { handler, info })
}

struct TypedAction<A> {
    handler: A,
    info: CapabilityInfo,
}

#[async_trait]
impl<A: JsonAction> ActionHandler for TypedAction<A> {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn poll(
        &self,
        ctx: &HandlerContext,
        options: &serde_json::Value,
        state: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError> {
        let options = A::Options::deserialize(options).map_err(HandlerError::InvalidOptions)?;
        let decoded = state::decode_or_else(state, || self.handler.default_state());
        if let Decoded::Reinitialized { reason, .. } = &decoded {
            tracing::info!(
                unit_id = %ctx.unit_id,
                capability = %self.info.name,
                ?reason,
                "initializing handler state"
            );
        }
        let evaluation = self
            .handler
            .evaluate(ctx, options, decoded.into_inner())
            .await?;
        Ok(ActionOutcome {
            fact: evaluation.fact,
            state: state::encode(&evaluation.state)?,
        })
    }
}

struct TypedReaction<R> {
    handler: R,
    info: CapabilityInfo,
}

#[async_trait]
impl<R: JsonReaction> ReactionHandler for TypedReaction<R> {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn react(
        &self,
        ctx: &HandlerContext,
        options: &serde_json::Value,
        fact: &str,
    ) -> Result<String, HandlerError> {
        let options = R::Options::deserialize(options).map_err(HandlerError::InvalidOptions)?;
        self.handler.execute(ctx, options, fact).await
    }
}
