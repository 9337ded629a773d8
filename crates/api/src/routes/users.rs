//! User account routes.
//!
//! Registration and login are open; logout and `me` take a bearer token.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::bad_json;
use crate::error::Result;
use crate::middleware::{BearerToken, RequireAuth};
use crate::models::AuthenticatedUser;
use crate::state::AppState;

/// Credentials posted to register and login.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Response from a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: AuthenticatedUser,
}

/// Create an account.
///
/// POST /api/users/register
///
/// # Errors
///
/// 400 for a malformed username or weak password, 409 if the username is taken.
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthenticatedUser>)> {
    let Json(credentials) = body.map_err(|e| bad_json(&e))?;

    let user = state
        .auth()
        .register(&credentials.username, &credentials.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange credentials for a bearer token.
///
/// POST /api/users/login
///
/// # Errors
///
/// 401 if the username or password is wrong (indistinguishably).
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(credentials) = body.map_err(|e| bad_json(&e))?;

    let (user, issued) = state
        .auth()
        .login(&credentials.username, &credentials.password)
        .await?;

    Ok(Json(LoginResponse {
        token: issued.token.expose_secret().to_owned(),
        token_type: "Bearer",
        expires_at: issued.expires_at,
        user: user.into(),
    }))
}

/// Revoke the presented token.
///
/// POST /api/users/logout
///
/// Revoking an unknown or already revoked token still succeeds.
///
/// # Errors
///
/// 401 if no bearer token is presented.
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode> {
    state.auth().logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The user the presented token belongs to.
///
/// GET /api/users/me
pub async fn me(RequireAuth(user): RequireAuth) -> Json<AuthenticatedUser> {
    Json(user)
}
