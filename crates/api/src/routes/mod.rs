//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                     - Liveness text ("API OK")
//! GET    /health               - Health check
//! GET    /health/ready         - Readiness (store reachable)
//!
//! # Users
//! POST   /api/users/register   - Create an account
//! POST   /api/users/login      - Exchange credentials for a bearer token
//! POST   /api/users/logout     - Revoke the presented token (bearer)
//! GET    /api/users/me         - Current user (bearer)
//!
//! # Contacts (bearer; scoped to the token's owner)
//! GET    /api/contacts         - List own contacts
//! POST   /api/contacts         - Create (409 on duplicate name)
//! GET    /api/contacts/{id}    - Fetch one
//! PUT    /api/contacts/{id}    - Partial update / rename (409 on duplicate name)
//! DELETE /api/contacts/{id}    - Delete
//! ```

pub mod contacts;
pub mod users;

use axum::{
    Router,
    extract::rejection::JsonRejection,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/me", get(users::me))
}

/// Create the contact routes router.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(contacts::index).post(contacts::create))
        .route(
            "/{id}",
            get(contacts::show)
                .put(contacts::update)
                .delete(contacts::delete),
        )
}

/// Turn a JSON body rejection into a validation error.
fn bad_json(rejection: &JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}
