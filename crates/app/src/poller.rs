//! Unit poller: the per-unit Action→Reaction loop.
//!
//! One poller runs per enabled unit, as its own tokio task:
//!
//! ```text
//! Starting → Polling → Triggered → Reacting ┐
//!               ↑  └──→ Idle ───────────────┤
//!               └───────── sleep ───────────┘
//! ```
//!
//! Within a unit the cycle is strictly sequential: read state, invoke the
//! Action, write state, invoke the Reaction. Cancellation is checked before
//! each cycle and raced against every sleep, never against a handler call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use relay_domain::error::ConfigurationError;
use relay_domain::schedule::effective_interval;
use relay_domain::state::StateBlob;
use relay_domain::unit::{AutomationUnit, UnitResult};

use crate::ports::{
    ActionHandler, CredentialStore, HandlerContext, ReactionHandler, UnitRepository,
};
use crate::registry::CapabilityRegistry;

/// Observable lifecycle of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollerState {
    Starting,
    /// Invoking the Action handler, or backing off after a failed cycle.
    Polling,
    /// The Action did not fire; sleeping until the next cycle.
    Idle,
    Triggered,
    /// Running the Reaction, then sleeping until the next cycle.
    Reacting,
    Stopped,
}

/// Shared collaborators every poller needs.
pub struct PollerEnv<R> {
    pub registry: Arc<CapabilityRegistry>,
    pub repo: Arc<R>,
    pub credentials: Arc<dyn CredentialStore>,
    /// Pause after a failed cycle.
    pub error_backoff: Duration,
}

impl<R> Clone for PollerEnv<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            repo: Arc::clone(&self.repo),
            credentials: Arc::clone(&self.credentials),
            error_backoff: self.error_backoff,
        }
    }
}

/// A unit bound to its resolved handlers, ready to [`run`](Self::run).
pub struct UnitPoller<R> {
    unit: AutomationUnit,
    action: Arc<dyn ActionHandler>,
    reaction: Arc<dyn ReactionHandler>,
    interval: Duration,
    ctx: HandlerContext,
    repo: Arc<R>,
    error_backoff: Duration,
    cancel: CancellationToken,
    status: Arc<watch::Sender<PollerState>>,
}

impl<R> UnitPoller<R>
where
    R: UnitRepository + Send + Sync + 'static,
{
    /// Resolve both capabilities of `unit` and compute its poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if either capability is not registered.
    pub fn prepare(
        unit: AutomationUnit,
        env: &PollerEnv<R>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigurationError> {
        let action = env
            .registry
            .resolve_action(&unit.action.service, &unit.action.name)?;
        let reaction = env
            .registry
            .resolve_reaction(&unit.reaction.service, &unit.reaction.name)?;
        let interval = effective_interval(action.info().minimum_refresh_rate, unit.refresh_rate);
        let (status, _) = watch::channel(PollerState::Starting);
        Ok(Self {
            ctx: HandlerContext::new(unit.id, unit.owner, Arc::clone(&env.credentials)),
            unit,
            action,
            reaction,
            interval,
            repo: Arc::clone(&env.repo),
            error_backoff: env.error_backoff,
            cancel,
            status: Arc::new(status),
        })
    }

    /// Time between two successful cycles.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle on the published state; survives the poller itself.
    #[must_use]
    pub fn status(&self) -> Arc<watch::Sender<PollerState>> {
        Arc::clone(&self.status)
    }

    /// Run cycles until the cancellation token fires.
    ///
    /// Stops without polling if the unit was deleted before the task began.
    #[tracing::instrument(name = "poller", skip(self), fields(unit_id = %self.unit.id))]
    pub async fn run(self) {
        let Some(mut state) = self.initial_state().await else {
            self.status.send_replace(PollerState::Stopped);
            return;
        };
        tracing::debug!(interval = ?self.interval, "poller started");
        while !self.cancel.is_cancelled() {
            self.status.send_replace(PollerState::Polling);
            let pause = self.cycle(&mut state).await;
            if !self.pause(pause).await {
                break;
            }
        }
        self.status.send_replace(PollerState::Stopped);
        tracing::debug!("poller stopped");
    }

    /// Stored state of the unit; `None` once the unit is gone.
    async fn initial_state(&self) -> Option<StateBlob> {
        match self.repo.load_unit(self.unit.id).await {
            Ok(Some(stored)) => Some(stored.state),
            Ok(None) => {
                tracing::warn!("unit no longer exists, poller not started");
                None
            }
            Err(err) => {
                tracing::warn!(error = %error_chain(&err), "failed to load unit state");
                Some(self.unit.state.clone())
            }
        }
    }

    /// One Action→Reaction cycle; returns how long to wait before the next.
    async fn cycle(&self, state: &mut StateBlob) -> Duration {
        let outcome = match self
            .action
            .poll(&self.ctx, &self.unit.action.options, state)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %error_chain(&err), "action failed");
                return self.error_backoff;
            }
        };

        if outcome.state != *state {
            if let Err(err) = self
                .repo
                .save_unit_state(self.unit.id, outcome.state.clone())
                .await
            {
                tracing::warn!(error = %error_chain(&err), "failed to persist unit state");
                return self.error_backoff;
            }
            *state = outcome.state;
        }

        let Some(fact) = outcome.fact else {
            self.status.send_replace(PollerState::Idle);
            return self.interval;
        };

        self.status.send_replace(PollerState::Triggered);
        tracing::info!(%fact, "action fired");
        self.status.send_replace(PollerState::Reacting);
        let result = match self
            .reaction
            .react(&self.ctx, &self.unit.reaction.options, &fact)
            .await
        {
            Ok(message) => UnitResult::success(message),
            Err(err) => {
                let message = error_chain(&err);
                tracing::warn!(error = %message, "reaction failed");
                UnitResult::failure(message)
            }
        };
        if let Err(err) = self.repo.save_unit_result(self.unit.id, result).await {
            tracing::warn!(error = %error_chain(&err), "failed to record unit result");
        }
        self.interval
    }

    /// Sleep for `duration`; `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

/// Render an error and its sources as `outer: inner: root`.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
