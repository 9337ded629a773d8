//! Authentication service.
//!
//! Password registration/login plus opaque bearer sessions. Tokens are 32
//! random bytes (URL-safe base64); only their SHA-256 digest is stored, so a
//! leaked session table cannot be replayed.

mod error;

pub use error::AuthError;

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{TimeDelta, Utc};
use rand::RngCore;
use secrecy::SecretString;
use sha2::{Digest, Sha256};

use contacts_core::Username;

use crate::db::{RepositoryError, SessionStore, UserStore};
use crate::models::{AuthenticatedUser, IssuedToken, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bounds hashing cost).
const MAX_PASSWORD_LENGTH: usize = 1024;

/// Random bytes per bearer token.
const TOKEN_BYTES: usize = 32;

/// Authentication service.
///
/// Handles registration, login, token verification and logout.
pub struct AuthService<'a, S: ?Sized> {
    store: &'a S,
    token_ttl: Duration,
}

impl<'a, S> AuthService<'a, S>
where
    S: UserStore + SessionStore + ?Sized,
{
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a S, token_ttl: Duration) -> Self {
        Self { store, token_ttl }
    }

    /// Register a new user with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` if the username format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username is already registered.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(&username, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Login with username and password, issuing a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong,
    /// including when the username is not even well-formed.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .find_credentials(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let now = Utc::now();
        match self.store.purge_expired_sessions(now).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "Purged expired sessions"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
        }

        let token = generate_token();
        let ttl = TimeDelta::from_std(self.token_ttl).unwrap_or_else(|_| TimeDelta::hours(24));
        let expires_at = now + ttl;

        self.store
            .create_session(user.id, &token_digest(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok((
            user,
            IssuedToken {
                token: SecretString::from(token),
                expires_at,
            },
        ))
    }

    /// Resolve a bearer token to the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` if the token is unknown, revoked or expired.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        self.store
            .find_session_user(&token_digest(token), Utc::now())
            .await?
            .map(AuthenticatedUser::from)
            .ok_or(AuthError::Unauthorized)
    }

    /// Revoke a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let revoked = self.store.delete_session(&token_digest(token)).await?;
        tracing::debug!(revoked, "Session revoked");
        Ok(())
    }
}

/// Generate a new opaque bearer token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest under which a token is stored.
fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
