//! `SQLite` implementation of [`UnitRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use relay_app::ports::UnitRepository;
use relay_domain::error::{NotFoundError, RelayError};
use relay_domain::id::{UnitId, UserId};
use relay_domain::state::StateBlob;
use relay_domain::time::Timestamp;
use relay_domain::unit::{AutomationUnit, CapabilityRef, UnitResult};

use crate::error::StorageError;

fn decode_err(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(decode_err)
}

struct Wrapper(AutomationUnit);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<AutomationUnit> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let owner: String = row.try_get("owner_id")?;
        let action_options: String = row.try_get("action_options")?;
        let reaction_options: String = row.try_get("reaction_options")?;
        let refresh_rate: i64 = row.try_get("refresh_rate")?;
        let state: Vec<u8> = row.try_get("state")?;
        let last_result: Option<String> = row.try_get("last_result")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        let last_result: Option<UnitResult> = last_result
            .map(|json| serde_json::from_str(&json).map_err(decode_err))
            .transpose()?;

        Ok(Self(AutomationUnit {
            id: UnitId::from_str(&id).map_err(decode_err)?,
            owner: UserId::from_str(&owner).map_err(decode_err)?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            action: CapabilityRef::new(
                row.try_get::<String, _>("action_service")?,
                row.try_get::<String, _>("action_name")?,
                serde_json::from_str(&action_options).map_err(decode_err)?,
            ),
            reaction: CapabilityRef::new(
                row.try_get::<String, _>("reaction_service")?,
                row.try_get::<String, _>("reaction_name")?,
                serde_json::from_str(&reaction_options).map_err(decode_err)?,
            ),
            enabled: row.try_get("enabled")?,
            refresh_rate: u64::try_from(refresh_rate).map_err(decode_err)?,
            state: StateBlob::from_bytes(state),
            last_result,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }
}

/// `SQLite`-backed unit repository.
#[derive(Debug, Clone)]
pub struct SqliteUnitRepository {
    pool: SqlitePool,
}

impl SqliteUnitRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn refresh_rate(unit: &AutomationUnit) -> i64 {
    i64::try_from(unit.refresh_rate).unwrap_or(i64::MAX)
}

impl UnitRepository for SqliteUnitRepository {
    async fn create(&self, unit: AutomationUnit) -> Result<AutomationUnit, RelayError> {
        let action_options =
            serde_json::to_string(&unit.action.options).map_err(StorageError::from)?;
        let reaction_options =
            serde_json::to_string(&unit.reaction.options).map_err(StorageError::from)?;
        let last_result = unit
            .last_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::from)?;

        sqlx::query(
                "INSERT INTO units (id, owner_id, title, description, action_service, action_name, action_options, reaction_service, reaction_name, reaction_options, enabled, refresh_rate, state, last_result, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(unit.id.to_string())
            .bind(unit.owner.to_string())
            .bind(&unit.title)
            .bind(&unit.description)
            .bind(&unit.action.service)
            .bind(&unit.action.name)
            .bind(&action_options)
            .bind(&unit.reaction.service)
            .bind(&unit.reaction.name)
            .bind(&reaction_options)
            .bind(unit.enabled)
            .bind(refresh_rate(&unit))
            .bind(unit.state.as_bytes())
            .bind(&last_result)
            .bind(unit.created_at.to_rfc3339())
            .bind(unit.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(unit)
    }

    async fn load_unit(&self, id: UnitId) -> Result<Option<AutomationUnit>, RelayError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM units WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<AutomationUnit>, RelayError> {
        let rows: Vec<Wrapper> = sqlx::query_as("SELECT * FROM units ORDER BY created_at, title")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn list_enabled_units(&self) -> Result<Vec<AutomationUnit>, RelayError> {
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM units WHERE enabled = 1 ORDER BY created_at, title")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, unit: AutomationUnit) -> Result<AutomationUnit, RelayError> {
        let action_options =
            serde_json::to_string(&unit.action.options).map_err(StorageError::from)?;
        let reaction_options =
            serde_json::to_string(&unit.reaction.options).map_err(StorageError::from)?;

        let result = sqlx::query(
                "UPDATE units SET title = ?, description = ?, action_service = ?, action_name = ?, action_options = ?, reaction_service = ?, reaction_name = ?, reaction_options = ?, enabled = ?, refresh_rate = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&unit.title)
            .bind(&unit.description)
            .bind(&unit.action.service)
            .bind(&unit.action.name)
            .bind(&action_options)
            .bind(&unit.reaction.service)
            .bind(&unit.reaction.name)
            .bind(&reaction_options)
            .bind(unit.enabled)
            .bind(refresh_rate(&unit))
            .bind(unit.updated_at.to_rfc3339())
            .bind(unit.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "AutomationUnit",
                id: unit.id.to_string(),
            }
            .into());
        }

        self.load_unit(unit.id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "AutomationUnit",
                id: unit.id.to_string(),
            }
            .into()
        })
    }

    async fn save_unit_state(&self, id: UnitId, state: StateBlob) -> Result<(), RelayError> {
        sqlx::query("UPDATE units SET state = ? WHERE id = ?")
            .bind(state.into_bytes())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn save_unit_result(&self, id: UnitId, result: UnitResult) -> Result<(), RelayError> {
        let json = serde_json::to_string(&result).map_err(StorageError::from)?;
        sqlx::query("UPDATE units SET last_result = ? WHERE id = ?")
            .bind(json)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete(&self, id: UnitId) -> Result<(), RelayError> {
        sqlx::query("DELETE FROM units WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
