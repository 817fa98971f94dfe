//! `SQLite` implementation of [`CredentialStore`].
//!
//! Tokens are written by whatever performs the OAuth exchange; the engine
//! only reads them.

use async_trait::async_trait;
use sqlx::SqlitePool;

use relay_app::ports::{AccessToken, CredentialStore};
use relay_domain::error::RelayError;
use relay_domain::id::UserId;

use crate::error::StorageError;

/// `SQLite`-backed token store keyed by `(user, service)`.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the token `user` granted for `service`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn store_token(
        &self,
        user: UserId,
        service: &str,
        token: &AccessToken,
    ) -> Result<(), RelayError> {
        sqlx::query(
                "INSERT INTO credentials (user_id, service, token, expires_at) VALUES (?, ?, ?, ?) ON CONFLICT (user_id, service) DO UPDATE SET token = excluded.token, expires_at = excluded.expires_at",
            )
            .bind(user.to_string())
            .bind(service)
            .bind(&token.token)
            .bind(token.expires_at.map(|at| at.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        tracing::debug!(user_id = %user, service, "access token stored");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn access_token(
        &self,
        user: UserId,
        service: &str,
    ) -> Result<Option<AccessToken>, RelayError> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT token, expires_at FROM credentials WHERE user_id = ? AND service = ?",
        )
        .bind(user.to_string())
        .bind(service)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        let Some((token, expires_at)) = row else {
            return Ok(None);
        };
        let expires_at = expires_at
            .map(|value| {
                chrono::DateTime::parse_from_rfc3339(&value)
                    .map(|dt| dt.to_utc())
                    .map_err(|err| StorageError::Database(sqlx::Error::Decode(Box::new(err))))
            })
            .transpose()?;
        Ok(Some(AccessToken { token, expires_at }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteCredentialStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteCredentialStore::new(db.pool().clone())
    }

    #[tokio::test]
    async fn should_return_none_when_no_token_stored() {
        let store = setup().await;
        let token = store.access_token(UserId::new(), "spotify").await.unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn should_return_stored_token() {
        let store = setup().await;
        let user = UserId::new();
        let expires_at = chrono::DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .to_utc();
        let token = AccessToken {
            token: "abc".to_string(),
            expires_at: Some(expires_at),
        };
        store.store_token(user, "spotify", &token).await.unwrap();

        let fetched = store.access_token(user, "spotify").await.unwrap();
        assert_eq!(fetched, Some(token));
    }

    #[tokio::test]
    async fn should_replace_existing_token() {
        let store = setup().await;
        let user = UserId::new();
        store
            .store_token(user, "spotify", &AccessToken::new("old"))
            .await
            .unwrap();
        store
            .store_token(user, "spotify", &AccessToken::new("new"))
            .await
            .unwrap();

        let fetched = store.access_token(user, "spotify").await.unwrap().unwrap();
        assert_eq!(fetched.token, "new");
        assert!(fetched.expires_at.is_none());
    }

    #[tokio::test]
    async fn should_scope_tokens_by_user_and_service() {
        let store = setup().await;
        let user = UserId::new();
        store
            .store_token(user, "spotify", &AccessToken::new("abc"))
            .await
            .unwrap();

        assert!(store.access_token(UserId::new(), "spotify").await.unwrap().is_none());
        assert!(store.access_token(user, "weather").await.unwrap().is_none());
    }
}
