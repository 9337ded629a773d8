//! User domain types.

use chrono::{DateTime, Utc};

use contacts_core::{UserId, Username};

/// A registered account (domain type).
///
/// The password hash is not part of this type; it only leaves the store
/// through [`crate::db::UserStore::find_credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login identifier.
    pub username: Username,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
