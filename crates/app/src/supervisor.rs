//! Poller supervisor: owns the set of running pollers.
//!
//! Starting a unit spawns its [`UnitPoller`] as a tokio task under a child
//! cancellation token; stopping it cancels the token and joins the task.
//! A poller that panics is contained: the panic is logged, its state becomes
//! [`PollerState::Stopped`], and every other poller keeps running.
//!
//! `start`, `stop` and `restart` of one unit are serialized on a per-unit
//! lock, so a unit never has two live pollers, even while a stop is still
//! waiting for the previous task.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Mutex as LifecycleLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use relay_domain::error::RelayError;
use relay_domain::id::UnitId;
use relay_domain::unit::{AutomationUnit, ResultOutcome, UnitResult};

use crate::poller::{PollerEnv, PollerState, UnitPoller, error_chain};
use crate::ports::{CredentialStore, UnitRepository};
use crate::registry::CapabilityRegistry;

/// Engine timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pause after a failed cycle.
    pub error_backoff: Duration,
    /// How long `stop` waits for a poller before aborting it.
    pub stop_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of [`PollerSupervisor::boot`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub started: Vec<UnitId>,
    /// Units whose capabilities could not be resolved.
    pub failed: Vec<UnitId>,
}

struct RunningPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    status: Arc<watch::Sender<PollerState>>,
}

/// Starts, stops and observes unit pollers.
pub struct PollerSupervisor<R> {
    env: PollerEnv<R>,
    stop_timeout: Duration,
    root: CancellationToken,
    pollers: Mutex<HashMap<UnitId, RunningPoller>>,
    lifecycles: Mutex<HashMap<UnitId, Arc<LifecycleLock<()>>>>,
}

impl<R> PollerSupervisor<R>
where
    R: UnitRepository + Send + Sync + 'static,
{
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        repo: Arc<R>,
        credentials: Arc<dyn CredentialStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            env: PollerEnv {
                registry,
                repo,
                credentials,
                error_backoff: settings.error_backoff,
            },
            stop_timeout: settings.stop_timeout,
            root: CancellationToken::new(),
            pollers: Mutex::new(HashMap::new()),
            lifecycles: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.env.registry
    }

    fn pollers(&self) -> MutexGuard<'_, HashMap<UnitId, RunningPoller>> {
        self.pollers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lifecycle(&self, id: UnitId) -> Arc<LifecycleLock<()>> {
        let mut locks = self.lifecycles.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    /// Drop the lock of `id` once no other lifecycle call is waiting on it.
    fn release_lifecycle(&self, id: UnitId, lock: &Arc<LifecycleLock<()>>) {
        let mut locks = self.lifecycles.lock().unwrap_or_else(PoisonError::into_inner);
        // one reference in the map, one held by the caller
        if Arc::strong_count(lock) <= 2 {
            locks.remove(&id);
        }
    }

    /// Spawn a poller for `unit`. No-op if one is already running.
    ///
    /// Waits for a pending `stop` of the same unit to finish first.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Configuration`] if the unit references a
    /// capability that is not registered; nothing is spawned in that case.
    pub async fn start(&self, unit: &AutomationUnit) -> Result<(), RelayError> {
        let lock = self.lifecycle(unit.id);
        let result = {
            let _guard = lock.lock().await;
            self.spawn(unit)
        };
        self.release_lifecycle(unit.id, &lock);
        result
    }

    fn spawn(&self, unit: &AutomationUnit) -> Result<(), RelayError> {
        let mut pollers = self.pollers();
        if let Some(running) = pollers.get(&unit.id) {
            if !running.handle.is_finished() {
                return Ok(());
            }
            pollers.remove(&unit.id);
        }

        let cancel = self.root.child_token();
        let poller = UnitPoller::prepare(unit.clone(), &self.env, cancel.clone())?;
        let status = poller.status();
        let handle = tokio::spawn(supervised(
            unit.id,
            poller,
            Arc::clone(&status),
            Arc::clone(&self.env.repo),
        ));
        tracing::info!(unit_id = %unit.id, title = %unit.title, "poller started");
        pollers.insert(
            unit.id,
            RunningPoller {
                cancel,
                handle,
                status,
            },
        );
        Ok(())
    }

    /// Stop the poller of `id` and wait for it to finish.
    ///
    /// Once this returns, the poller will not write to the repository again.
    /// No-op for ids that are not running.
    pub async fn stop(&self, id: UnitId) {
        let lock = self.lifecycle(id);
        {
            let _guard = lock.lock().await;
            self.halt(id).await;
        }
        self.release_lifecycle(id, &lock);
    }

    async fn halt(&self, id: UnitId) {
        let running = self.pollers().remove(&id);
        if let Some(running) = running {
            self.join(id, running).await;
        }
    }

    async fn join(&self, id: UnitId, running: RunningPoller) {
        let RunningPoller {
            cancel,
            mut handle,
            status,
        } = running;
        cancel.cancel();
        if tokio::time::timeout(self.stop_timeout, &mut handle)
            .await
            .is_err()
        {
            tracing::warn!(unit_id = %id, timeout = ?self.stop_timeout, "poller did not stop in time, aborting");
            handle.abort();
            let _ = handle.await;
        }
        status.send_replace(PollerState::Stopped);
        tracing::info!(unit_id = %id, "poller stopped");
    }

    /// Stop then start `unit`, picking up its latest definition.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub async fn restart(&self, unit: &AutomationUnit) -> Result<(), RelayError> {
        let lock = self.lifecycle(unit.id);
        let result = {
            let _guard = lock.lock().await;
            self.halt(unit.id).await;
            self.spawn(unit)
        };
        self.release_lifecycle(unit.id, &lock);
        result
    }

    /// Start every enabled unit in the repository.
    ///
    /// A unit with unresolved capabilities is skipped and the error is
    /// recorded as its latest result; the others still start.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the enabled units cannot be listed.
    pub async fn boot(&self) -> Result<BootReport, RelayError> {
        let units = self.env.repo.list_enabled_units().await?;
        let mut report = BootReport::default();
        for unit in units {
            match self.start(&unit).await {
                Ok(()) => report.started.push(unit.id),
                Err(err) => {
                    tracing::error!(unit_id = %unit.id, error = %error_chain(&err), "unit not started");
                    self.record_configuration_error(&unit, &err).await;
                    report.failed.push(unit.id);
                }
            }
        }
        tracing::info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "supervisor booted"
        );
        Ok(report)
    }

    /// Store `err` as the unit's latest result, unless that exact error is
    /// already recorded.
    pub(crate) async fn record_configuration_error(
        &self,
        unit: &AutomationUnit,
        err: &RelayError,
    ) {
        let message = error_chain(err);
        let already_recorded = unit.last_result.as_ref().is_some_and(|last| {
            last.outcome == ResultOutcome::ConfigurationError && last.message == message
        });
        if already_recorded {
            return;
        }
        if let Err(err) = self
            .env
            .repo
            .save_unit_result(unit.id, UnitResult::configuration_error(message))
            .await
        {
            tracing::warn!(unit_id = %unit.id, error = %error_chain(&err), "failed to record unit result");
        }
    }

    /// Current state of the poller for `id`, if one was started.
    #[must_use]
    pub fn state(&self, id: UnitId) -> Option<PollerState> {
        self.pollers()
            .get(&id)
            .map(|running| *running.status.borrow())
    }

    /// Subscribe to state changes of the poller for `id`.
    #[must_use]
    pub fn watch(&self, id: UnitId) -> Option<watch::Receiver<PollerState>> {
        self.pollers()
            .get(&id)
            .map(|running| running.status.subscribe())
    }

    /// Ids of every poller whose task is still alive, sorted.
    #[must_use]
    pub fn running(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self
            .pollers()
            .iter()
            .filter(|(_, running)| !running.handle.is_finished())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Stop every poller. Pollers started afterwards stop immediately.
    pub async fn shutdown(&self) {
        let pollers: Vec<_> = self.pollers().drain().collect();
        tracing::info!(count = pollers.len(), "stopping all pollers");
        self.root.cancel();
        futures::future::join_all(
            pollers
                .into_iter()
                .map(|(id, running)| self.join(id, running)),
        )
        .await;
    }
}

async fn supervised<R>(
    id: UnitId,
    poller: UnitPoller<R>,
    status: Arc<watch::Sender<PollerState>>,
    repo: Arc<R>,
) where
    R: UnitRepository + Send + Sync + 'static,
{
    let Err(panic) = AssertUnwindSafe(poller.run()).catch_unwind().await else {
        return;
    };
    let reason = panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(unit_id = %id, %reason, "poller panicked");
    status.send_replace(PollerState::Stopped);
    let result = UnitResult::failure(format!("poller crashed: {reason}"));
    if let Err(err) = repo.save_unit_result(id, result).await {
        tracing::warn!(unit_id = %id, error = %error_chain(&err), "failed to record unit result");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NoCredentials;
    use crate::testing::{
        CountingAction, FailingAction, InMemoryUnitRepo, PanickingAction, PendingAction,
        RecordingReaction, SERVICE, SlowAction, unit,
    };

    struct Fixture {
        supervisor: PollerSupervisor<InMemoryUnitRepo>,
        repo: Arc<InMemoryUnitRepo>,
        counter: Arc<CountingAction>,
        failing: Arc<FailingAction>,
        slow: Arc<SlowAction>,
    }

    fn fixture(units: Vec<AutomationUnit>) -> Fixture {
        let counter = Arc::new(CountingAction::new("Count", 1000).with_minimum_refresh_rate(1));
        let failing = Arc::new(FailingAction::new("Fail"));
        let slow = Arc::new(SlowAction::new("Slow"));
        let registry = CapabilityRegistry::builder()
            .action(SERVICE, counter.clone())
            .action(SERVICE, failing.clone())
            .action(SERVICE, slow.clone())
            .action(SERVICE, Arc::new(PanickingAction::new("Panic")))
            .action(SERVICE, Arc::new(PendingAction::new("Hang")))
            .reaction(SERVICE, Arc::new(RecordingReaction::new("Record")))
            .build()
            .unwrap();
        let repo = Arc::new(InMemoryUnitRepo::with(units));
        let supervisor = PollerSupervisor::new(
            Arc::new(registry),
            Arc::clone(&repo),
            Arc::new(NoCredentials),
            EngineSettings {
                error_backoff: Duration::from_secs(1),
                stop_timeout: Duration::from_millis(200),
            },
        );
        Fixture {
            supervisor,
            repo,
            counter,
            failing,
            slow,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_reach_polling_after_start() {
        let unit = unit("Count", "Record");
        let fx = fixture(vec![unit.clone()]);
        fx.supervisor.start(&unit).await.unwrap();
        let mut rx = fx.supervisor.watch(unit.id).unwrap();

        tokio::time::timeout(
            Duration::from_millis(100),
            rx.wait_for(|state| *state != PollerState::Starting),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(fx.supervisor.running(), vec![unit.id]);
        fx.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_second_start_of_running_unit() {
        let unit = unit("Count", "Record");
        let fx = fixture(vec![unit.clone()]);
        fx.supervisor.start(&unit).await.unwrap();
        fx.supervisor.start(&unit).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(fx.counter.calls(), 1);
        fx.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_configuration_error_for_unknown_capability() {
        let unit = unit("Nope", "Record");
        let fx = fixture(vec![unit.clone()]);
        let result = fx.supervisor.start(&unit).await;
        assert!(matches!(result, Err(RelayError::Configuration(_))));
        assert!(fx.supervisor.state(unit.id).is_none());
        assert!(fx.supervisor.running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_save_state_after_stop_returns() {
        let unit = unit("Count", "Record");
        let id = unit.id;
        let fx = fixture(vec![unit.clone()]);
        fx.supervisor.start(&unit).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        fx.supervisor.stop(id).await;
        let writes = fx.repo.state_writes(id);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(writes, 3);
        assert_eq!(fx.repo.state_writes(id), writes);
        assert!(fx.supervisor.state(id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_overlap_pollers_when_started_during_stop() {
        let unit = unit("Slow", "Record");
        let fx = fixture(vec![unit.clone()]);
        fx.supervisor.start(&unit).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let ((), restarted) = tokio::join!(fx.supervisor.stop(unit.id), async {
            tokio::task::yield_now().await;
            fx.supervisor.start(&unit).await
        });
        restarted.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(fx.slow.max_in_flight(), 1);
        assert_eq!(fx.slow.calls(), 2);
        assert_eq!(fx.supervisor.running(), vec![unit.id]);
        fx.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_abort_poller_stuck_in_handler() {
        let unit = unit("Hang", "Record");
        let fx = fixture(vec![unit.clone()]);
        fx.supervisor.start(&unit).await.unwrap();
        let rx = fx.supervisor.watch(unit.id).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fx.supervisor.stop(unit.id).await;

        assert_eq!(*rx.borrow(), PollerState::Stopped);
        assert!(fx.supervisor.running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_contain_panicking_poller() {
        let healthy = unit("Count", "Record");
        let broken = unit("Panic", "Record");
        let fx = fixture(vec![healthy.clone(), broken.clone()]);
        fx.supervisor.start(&broken).await.unwrap();
        fx.supervisor.start(&healthy).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(fx.supervisor.state(broken.id), Some(PollerState::Stopped));
        assert_eq!(fx.supervisor.running(), vec![healthy.id]);
        assert_eq!(fx.counter.calls(), 3);
        let result = fx.repo.unit(broken.id).unwrap().last_result.unwrap();
        assert_eq!(result.message, "poller crashed: handler bug");
        fx.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_restart_finished_poller_on_start() {
        let unit = unit("Panic", "Record");
        let fx = fixture(vec![unit.clone()]);
        fx.supervisor.start(&unit).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fx.supervisor.running().is_empty());

        fx.supervisor.start(&unit).await.unwrap();
        assert_eq!(fx.supervisor.running(), vec![unit.id]);
        fx.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_boot_enabled_units_and_report_failures() {
        let good = unit("Count", "Record");
        let bad = unit("Count", "Nope");
        let mut disabled = unit("Count", "Record");
        disabled.enabled = false;
        let fx = fixture(vec![good.clone(), bad.clone(), disabled.clone()]);

        let report = fx.supervisor.boot().await.unwrap();

        assert_eq!(report.started, vec![good.id]);
        assert_eq!(report.failed, vec![bad.id]);
        assert!(fx.supervisor.state(disabled.id).is_none());
        let result = fx.repo.unit(bad.id).unwrap().last_result.unwrap();
        assert_eq!(result.outcome, ResultOutcome::ConfigurationError);
        assert_eq!(
            result.message,
            "configuration error: unknown reaction test/Nope"
        );
        fx.supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_record_configuration_error_only_once() {
        let bad = unit("Count", "Nope");
        let fx = fixture(vec![bad.clone()]);
        fx.supervisor.boot().await.unwrap();
        let first = fx.repo.unit(bad.id).unwrap().last_result.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        fx.supervisor.boot().await.unwrap();
        let second = fx.repo.unit(bad.id).unwrap().last_result.unwrap();

        assert_eq!(first.at, second.at);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_healthy_unit_polling_next_to_stuck_one() {
        let healthy = unit("Count", "Record");
        let stuck = unit("Hang", "Record");
        let fx = fixture(vec![healthy.clone(), stuck.clone()]);
        fx.supervisor.start(&stuck).await.unwrap();
        fx.supervisor.start(&healthy).await.unwrap();

        tokio::time::sleep(Duration::from_millis(4500)).await;

        assert_eq!(fx.counter.calls(), 5);
        fx.supervisor.shutdown().await;
        assert!(fx.supervisor.running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_healthy_unit_polling_next_to_failing_one() {
        let healthy = unit("Count", "Record");
        let failing = unit("Fail", "Record");
        let fx = fixture(vec![healthy.clone(), failing.clone()]);
        fx.supervisor.start(&failing).await.unwrap();
        fx.supervisor.start(&healthy).await.unwrap();

        tokio::time::sleep(Duration::from_millis(4500)).await;

        assert_eq!(fx.counter.calls(), 5);
        assert!(fx.failing.calls() >= 4);
        assert_eq!(fx.supervisor.state(failing.id), Some(PollerState::Polling));
        fx.supervisor.shutdown().await;
    }
}
