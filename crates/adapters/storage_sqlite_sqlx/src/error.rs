//! Storage-specific error type wrapping sqlx errors.

use relay_domain::error::RelayError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize a stored JSON value.
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for RelayError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_storage_error_as_source() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: RelayError = StorageError::from(json).into();
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "JSON serialization error");
    }
}
