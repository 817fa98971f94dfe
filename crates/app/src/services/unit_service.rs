//! Unit service: use-cases for managing automation units.
//!
//! Every mutation keeps the supervisor in step with the repository: enabling
//! starts a poller, disabling or deleting stops it, and editing restarts it.

use std::sync::Arc;

use relay_domain::error::{NotFoundError, RelayError};
use relay_domain::id::UnitId;
use relay_domain::state::StateBlob;
use relay_domain::unit::AutomationUnit;

use crate::ports::UnitRepository;
use crate::supervisor::PollerSupervisor;

/// Application service for unit CRUD and lifecycle.
pub struct UnitService<R> {
    repo: Arc<R>,
    supervisor: Arc<PollerSupervisor<R>>,
}

impl<R> UnitService<R>
where
    R: UnitRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, supervisor: Arc<PollerSupervisor<R>>) -> Self {
        Self { repo, supervisor }
    }

    /// Persist a new unit and start it if enabled.
    ///
    /// A unit referencing unknown capabilities is still stored; the
    /// configuration error is recorded as its latest result instead of
    /// being returned.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, unit), fields(unit_id = %unit.id, title = %unit.title))]
    pub async fn create_unit(&self, unit: AutomationUnit) -> Result<AutomationUnit, RelayError> {
        unit.validate()?;
        let unit = self.repo.create(unit).await?;
        if unit.enabled {
            self.start(&unit).await;
        }
        self.get_unit(unit.id).await
    }

    /// Look up a unit by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] when no unit with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_unit(&self, id: UnitId) -> Result<AutomationUnit, RelayError> {
        self.repo.load_unit(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "AutomationUnit",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all units.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_units(&self) -> Result<Vec<AutomationUnit>, RelayError> {
        self.repo.get_all().await
    }

    /// Enable or disable a unit, starting or stopping its poller.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if the unit does not exist, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(&self, id: UnitId, enabled: bool) -> Result<AutomationUnit, RelayError> {
        let mut unit = self.get_unit(id).await?;
        if unit.enabled != enabled {
            unit.enabled = enabled;
            unit.updated_at = relay_domain::time::now();
            unit = self.repo.update(unit).await?;
        }
        if enabled {
            self.start(&unit).await;
        } else {
            self.supervisor.stop(id).await;
        }
        self.get_unit(id).await
    }

    /// Replace the user-editable fields of a unit.
    ///
    /// Changing the Action (service, name or options) discards the stored
    /// state, since it belongs to the previous Action. The poller is
    /// restarted so the next cycle sees the new definition.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] if invariants fail,
    /// [`RelayError::NotFound`] if the unit does not exist, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self, unit), fields(unit_id = %unit.id))]
    pub async fn update_unit(&self, mut unit: AutomationUnit) -> Result<AutomationUnit, RelayError> {
        unit.validate()?;
        let existing = self.get_unit(unit.id).await?;
        let action_changed = existing.action != unit.action;

        self.supervisor.stop(unit.id).await;
        unit.created_at = existing.created_at;
        unit.updated_at = relay_domain::time::now();
        let unit = self.repo.update(unit).await?;
        if action_changed {
            tracing::debug!("action changed, discarding state");
            self.repo.save_unit_state(unit.id, StateBlob::empty()).await?;
        }
        if unit.enabled {
            let unit = self.get_unit(unit.id).await?;
            self.start(&unit).await;
        }
        self.get_unit(unit.id).await
    }

    /// Replace the options of the unit's Action and Reaction.
    ///
    /// # Errors
    ///
    /// See [`update_unit`](Self::update_unit).
    pub async fn update_options(
        &self,
        id: UnitId,
        action_options: serde_json::Value,
        reaction_options: serde_json::Value,
    ) -> Result<AutomationUnit, RelayError> {
        let mut unit = self.get_unit(id).await?;
        unit.action.options = action_options;
        unit.reaction.options = reaction_options;
        self.update_unit(unit).await
    }

    /// Stop the unit's poller, then delete it.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_unit(&self, id: UnitId) -> Result<(), RelayError> {
        self.supervisor.stop(id).await;
        self.repo.delete(id).await
    }

    async fn start(&self, unit: &AutomationUnit) {
        if let Err(err) = self.supervisor.start(unit).await {
            tracing::warn!(unit_id = %unit.id, error = %err, "unit not started");
            self.supervisor.record_configuration_error(unit, &err).await;
        }
    }
}
