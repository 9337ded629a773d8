//! Contact routes.
//!
//! Every handler takes the owner from [`RequireAuth`]; ids belonging to other
//! owners are indistinguishable from missing ones.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use contacts_core::ContactId;

use super::bad_json;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Contact;
use crate::services::{ContactError, ContactInput, ContactUpdateInput};
use crate::state::AppState;

/// Parse a path id; anything that is not a valid id names no contact.
fn contact_id(raw: &str) -> Result<ContactId> {
    raw.parse().map_err(|_| ContactError::NotFound.into())
}

/// List the owner's contacts, ordered by name.
///
/// GET /api/contacts
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Contact>>> {
    Ok(Json(state.contacts().list(user.id).await?))
}

/// Create a contact.
///
/// POST /api/contacts
///
/// # Errors
///
/// 409 `duplicate_contact` if the owner already has a contact with this name.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<ContactInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Contact>)> {
    let Json(input) = body.map_err(|e| bad_json(&e))?;

    let contact = state.contacts().create(user.id, input).await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

/// Fetch one contact.
///
/// GET /api/contacts/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Contact>> {
    let id = contact_id(&id)?;
    Ok(Json(state.contacts().get(user.id, id).await?))
}

/// Update or rename a contact.
///
/// PUT /api/contacts/{id}
///
/// # Errors
///
/// 404 if the owner has no such contact, 409 `duplicate_contact` if the new
/// name is used by another of the owner's contacts.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    body: std::result::Result<Json<ContactUpdateInput>, JsonRejection>,
) -> Result<Json<Contact>> {
    let id = contact_id(&id)?;
    let Json(input) = body.map_err(|e| bad_json(&e))?;

    Ok(Json(state.contacts().update(user.id, id, input).await?))
}

/// Delete a contact.
///
/// DELETE /api/contacts/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = contact_id(&id)?;
    state.contacts().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
