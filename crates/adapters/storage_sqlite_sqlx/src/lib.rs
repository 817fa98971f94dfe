//! # relay-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `UnitRepository` and `CredentialStore` from `relay-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `relay-app` (for port traits) and `relay-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod credential_store;
mod error;
mod pool;
mod unit_repo;

pub use credential_store::SqliteCredentialStore;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use unit_repo::SqliteUnitRepository;
