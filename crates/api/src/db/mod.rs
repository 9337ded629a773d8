//! Persistence for the contacts API.
//!
//! # Database: `PostgreSQL`
//!
//! ## Tables
//!
//! - `app_user` - Accounts (unique `username`, Argon2id password hash)
//! - `user_session` - Bearer sessions, keyed by SHA-256 token digest
//! - `contact` - Per-owner contacts
//!
//! ## Indexes
//!
//! The `(owner_id, name)` unique index on `contact` is declared in
//! [`indexes`] and built by [`Store::sync_indexes`] at startup, not by a
//! migration.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p contacts-cli -- migrate
//! ```
//!
//! # Adapters
//!
//! Handlers and services only see the [`Store`] trait family. [`PgStore`] is
//! the production adapter; `MemoryStore` (feature `test-support`) keeps
//! everything in process for tests.

pub mod contacts;
pub mod indexes;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod sessions;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use contacts_core::{ContactId, UserId, Username};

use crate::models::{Contact, ContactChanges, NewContact, User};

pub use indexes::{IndexSyncError, IndexSyncPolicy, IndexSyncReport};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Unique constraint violation, reported by the storage engine.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a sqlx error, turning unique violations into [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(err)
}

/// Account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Returns [`RepositoryError::Conflict`] if the username is taken.
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Fetch an account and its password hash by username.
    async fn find_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Bearer session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a session for `user_id` under the given token digest.
    async fn create_session(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Resolve a token digest to its user, ignoring sessions expired at `now`.
    async fn find_session_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Delete a session. Returns `false` if it did not exist.
    async fn delete_session(&self, token_hash: &str) -> Result<bool, RepositoryError>;

    /// Delete every session expired at `now`. Returns the number removed.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Contact persistence.
///
/// Every operation is scoped to an owner: a contact owned by someone else
/// behaves exactly like a missing one.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// All contacts of `owner`, ordered by name.
    async fn list_contacts(&self, owner: UserId) -> Result<Vec<Contact>, RepositoryError>;

    /// One contact of `owner`.
    async fn get_contact(
        &self,
        owner: UserId,
        id: ContactId,
    ) -> Result<Option<Contact>, RepositoryError>;

    /// Insert a contact for `owner`.
    ///
    /// The `(owner, name)` check and the write are one atomic step; a
    /// duplicate yields [`RepositoryError::Conflict`].
    async fn insert_contact(
        &self,
        owner: UserId,
        contact: &NewContact,
    ) -> Result<Contact, RepositoryError>;

    /// Apply changes to a contact of `owner`.
    ///
    /// Returns `Ok(None)` if no such contact exists for `owner`, and
    /// [`RepositoryError::Conflict`] if a rename collides with another of
    /// the owner's contacts.
    async fn update_contact(
        &self,
        owner: UserId,
        id: ContactId,
        changes: &ContactChanges,
    ) -> Result<Option<Contact>, RepositoryError>;

    /// Delete a contact of `owner`. Returns `false` if it did not exist.
    async fn delete_contact(&self, owner: UserId, id: ContactId) -> Result<bool, RepositoryError>;
}

/// Everything the API needs from its storage backend.
#[async_trait]
pub trait Store: UserStore + SessionStore + ContactStore {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Build any declared index that does not exist yet.
    async fn sync_indexes(&self) -> Result<IndexSyncReport, IndexSyncError>;
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `connect_timeout` - How long to wait for a connection before failing
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    connect_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(connect_timeout)
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL` implementation of [`Store`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn sync_indexes(&self) -> Result<IndexSyncReport, IndexSyncError> {
        indexes::sync_indexes(&self.pool, indexes::DECLARED_INDEXES).await
    }
}
