//! Session types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use contacts_core::{UserId, Username};

use super::User;

/// The owner identity attached to an authenticated request.
///
/// Produced by the bearer-token extractor and passed explicitly to every
/// contact operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Owner ID used for every contact query.
    pub id: UserId,
    /// Display name for the client.
    pub username: Username,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// A freshly issued bearer token.
///
/// The plaintext token only exists here; the store keeps its digest.
#[derive(Debug)]
pub struct IssuedToken {
    /// Opaque token value to hand to the client.
    pub token: SecretString,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}
