//! Test doubles shared by the engine's unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use relay_domain::capability::CapabilityInfo;
use relay_domain::error::{HandlerError, RelayError};
use relay_domain::id::UnitId;
use relay_domain::state::{self, StateBlob};
use relay_domain::unit::{AutomationUnit, CapabilityRef, UnitResult};

use crate::ports::{ActionHandler, ActionOutcome, HandlerContext, ReactionHandler, UnitRepository};

pub(crate) const SERVICE: &str = "test";

pub(crate) fn unit(action: &str, reaction: &str) -> AutomationUnit {
    AutomationUnit::builder()
        .title(format!("{action} then {reaction}"))
        .action(CapabilityRef::new(SERVICE, action, serde_json::json!({})))
        .reaction(CapabilityRef::new(SERVICE, reaction, serde_json::json!({})))
        .build()
        .unwrap()
}

// ── In-memory unit repo ────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryUnitRepo {
    store: Mutex<HashMap<UnitId, AutomationUnit>>,
    state_writes: Mutex<Vec<UnitId>>,
    fail_state_writes: AtomicBool,
}

impl InMemoryUnitRepo {
    pub(crate) fn with(units: Vec<AutomationUnit>) -> Self {
        let repo = Self::default();
        repo.store
            .lock()
            .unwrap()
            .extend(units.into_iter().map(|u| (u.id, u)));
        repo
    }

    pub(crate) fn unit(&self, id: UnitId) -> Option<AutomationUnit> {
        self.store.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn state_writes(&self, id: UnitId) -> usize {
        self.state_writes
            .lock()
            .unwrap()
            .iter()
            .filter(|written| **written == id)
            .count()
    }

    pub(crate) fn fail_state_writes(&self, fail: bool) {
        self.fail_state_writes.store(fail, Ordering::SeqCst);
    }
}

impl UnitRepository for InMemoryUnitRepo {
    fn create(
        &self,
        unit: AutomationUnit,
    ) -> impl Future<Output = Result<AutomationUnit, RelayError>> + Send {
        self.store.lock().unwrap().insert(unit.id, unit.clone());
        async { Ok(unit) }
    }

    fn load_unit(
        &self,
        id: UnitId,
    ) -> impl Future<Output = Result<Option<AutomationUnit>, RelayError>> + Send {
        let r = self.unit(id);
        async { Ok(r) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<AutomationUnit>, RelayError>> + Send {
        let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(r) }
    }

    fn list_enabled_units(
        &self,
    ) -> impl Future<Output = Result<Vec<AutomationUnit>, RelayError>> + Send {
        let r: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.enabled)
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn update(
        &self,
        unit: AutomationUnit,
    ) -> impl Future<Output = Result<AutomationUnit, RelayError>> + Send {
        let mut store = self.store.lock().unwrap();
        let r = match store.get_mut(&unit.id) {
            Some(existing) => {
                let state = std::mem::take(&mut existing.state);
                let last_result = existing.last_result.take();
                *existing = AutomationUnit {
                    state,
                    last_result,
                    ..unit
                };
                Ok(existing.clone())
            }
            None => Err(relay_domain::error::NotFoundError {
                entity: "AutomationUnit",
                id: unit.id.to_string(),
            }
            .into()),
        };
        async { r }
    }

    fn save_unit_state(
        &self,
        id: UnitId,
        state: StateBlob,
    ) -> impl Future<Output = Result<(), RelayError>> + Send {
        let r = if self.fail_state_writes.load(Ordering::SeqCst) {
            Err(RelayError::Storage(Box::new(std::io::Error::other("disk full"))))
        } else {
            self.state_writes.lock().unwrap().push(id);
            if let Some(unit) = self.store.lock().unwrap().get_mut(&id) {
                unit.state = state;
            }
            Ok(())
        };
        async { r }
    }

    fn save_unit_result(
        &self,
        id: UnitId,
        result: UnitResult,
    ) -> impl Future<Output = Result<(), RelayError>> + Send {
        if let Some(unit) = self.store.lock().unwrap().get_mut(&id) {
            unit.last_result = Some(result);
        }
        async { Ok(()) }
    }

    fn delete(&self, id: UnitId) -> impl Future<Output = Result<(), RelayError>> + Send {
        self.store.lock().unwrap().remove(&id);
        async { Ok(()) }
    }
}

// ── Actions ────────────────────────────────────────────────────

#[derive(serde::Serialize, serde::Deserialize)]
struct Count {
    count: u32,
}

/// Counts its invocations in the state blob; fires when `threshold` is reached.
pub(crate) struct CountingAction {
    info: CapabilityInfo,
    threshold: u32,
    calls: AtomicUsize,
}

impl CountingAction {
    pub(crate) fn new(name: &str, threshold: u32) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Counts cycles"),
            threshold,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_minimum_refresh_rate(mut self, seconds: u64) -> Self {
        self.info = self.info.with_minimum_refresh_rate(seconds);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionHandler for CountingAction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn poll(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        blob: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = state::decode_or_else(blob, || Count { count: 0 }).into_inner();
        let next = Count {
            count: current.count + 1,
        };
        let encoded = state::encode(&next)?;
        if next.count == self.threshold {
            Ok(ActionOutcome::fired(format!("counter={}", next.count), encoded))
        } else {
            Ok(ActionOutcome::idle(encoded))
        }
    }
}

/// Always fails with an upstream status.
pub(crate) struct FailingAction {
    info: CapabilityInfo,
    calls: AtomicUsize,
}

impl FailingAction {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Always fails"),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionHandler for FailingAction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn poll(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        _state: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::UnexpectedStatus { status: 503 })
    }
}

pub(crate) struct PanickingAction {
    info: CapabilityInfo,
}

impl PanickingAction {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Panics"),
        }
    }
}

#[async_trait]
impl ActionHandler for PanickingAction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn poll(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        _state: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError> {
        panic!("handler bug");
    }
}

/// Never completes; models a handler stuck on IO.
pub(crate) struct PendingAction {
    info: CapabilityInfo,
}

impl PendingAction {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Hangs forever"),
        }
    }
}

#[async_trait]
impl ActionHandler for PendingAction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn poll(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        _state: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError> {
        std::future::pending().await
    }
}

/// Takes one second per poll and tracks how many polls overlap.
pub(crate) struct SlowAction {
    info: CapabilityInfo,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowAction {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Slow upstream").with_minimum_refresh_rate(1),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count even when the poll is aborted.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActionHandler for SlowAction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn poll(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        state: &StateBlob,
    ) -> Result<ActionOutcome, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        Ok(ActionOutcome::idle(state.clone()))
    }
}

// ── Reactions ──────────────────────────────────────────────────

pub(crate) struct RecordingReaction {
    info: CapabilityInfo,
    facts: Mutex<Vec<String>>,
}

impl RecordingReaction {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Records facts"),
            facts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn facts(&self) -> Vec<String> {
        self.facts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReactionHandler for RecordingReaction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn react(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        fact: &str,
    ) -> Result<String, HandlerError> {
        self.facts.lock().unwrap().push(fact.to_string());
        Ok(format!("recorded: {fact}"))
    }
}

pub(crate) struct FailingReaction {
    info: CapabilityInfo,
}

impl FailingReaction {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            info: CapabilityInfo::new(name, "Always fails"),
        }
    }
}

#[async_trait]
impl ReactionHandler for FailingReaction {
    fn info(&self) -> &CapabilityInfo {
        &self.info
    }

    async fn react(
        &self,
        _ctx: &HandlerContext,
        _options: &serde_json::Value,
        _fact: &str,
    ) -> Result<String, HandlerError> {
        Err(HandlerError::MissingCredential {
            service: SERVICE.to_string(),
        })
    }
}
