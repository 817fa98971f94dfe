//! Unit repository port: persistence for automation units.
//!
//! Implementations must support many concurrent calls for distinct unit ids.
//! No cross-row locking is required: a unit's `state` column is only ever
//! written by that unit's poller.

use std::future::Future;

use relay_domain::error::RelayError;
use relay_domain::id::UnitId;
use relay_domain::state::StateBlob;
use relay_domain::unit::{AutomationUnit, UnitResult};

/// Repository for persisting and querying [`AutomationUnit`]s.
pub trait UnitRepository {
    /// Create a new unit in storage.
    fn create(
        &self,
        unit: AutomationUnit,
    ) -> impl Future<Output = Result<AutomationUnit, RelayError>> + Send;

    /// Load a unit by its unique identifier.
    fn load_unit(
        &self,
        id: UnitId,
    ) -> impl Future<Output = Result<Option<AutomationUnit>, RelayError>> + Send;

    /// Get all units.
    fn get_all(&self) -> impl Future<Output = Result<Vec<AutomationUnit>, RelayError>> + Send;

    /// Get all enabled units.
    fn list_enabled_units(
        &self,
    ) -> impl Future<Output = Result<Vec<AutomationUnit>, RelayError>> + Send;

    /// Update the user-editable fields of an existing unit.
    ///
    /// `state` and `last_result` are left untouched: they belong to the poller.
    fn update(
        &self,
        unit: AutomationUnit,
    ) -> impl Future<Output = Result<AutomationUnit, RelayError>> + Send;

    /// Overwrite the opaque state blob of a unit.
    fn save_unit_state(
        &self,
        id: UnitId,
        state: StateBlob,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Record the latest user-visible result of a unit.
    fn save_unit_result(
        &self,
        id: UnitId,
        result: UnitResult,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Delete a unit by its unique identifier.
    fn delete(&self, id: UnitId) -> impl Future<Output = Result<(), RelayError>> + Send;
}
