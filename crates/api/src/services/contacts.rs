//! Contact service.
//!
//! Validates client input and delegates to the [`ContactStore`]. The
//! `(owner, name)` rule is never checked here: the store reports a collision
//! as [`RepositoryError::Conflict`] from the same statement that would have
//! written the row, and this service only translates it.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use contacts_core::{ContactId, ContactName, ContactNameError, UserId};

use crate::db::{ContactStore, RepositoryError};
use crate::models::{Contact, ContactChanges, NewContact};

/// Maximum length of each free-form detail field, in characters.
pub const MAX_DETAIL_LENGTH: usize = 500;

/// Errors that can occur during contact operations.
#[derive(Debug, Error)]
pub enum ContactError {
    /// The owner already has a contact with this name.
    #[error("a contact named '{name}' already exists")]
    DuplicateContact {
        /// The colliding name, as stored.
        name: String,
    },

    /// No such contact for this owner.
    #[error("contact not found")]
    NotFound,

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<ContactNameError> for ContactError {
    fn from(err: ContactNameError) -> Self {
        Self::Validation(format!("name: {err}"))
    }
}

/// Body of a contact creation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of a contact update request.
///
/// Absent fields are left alone. An explicit `null` clears a detail field;
/// `name` cannot be cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdateInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Distinguish a field set to `null` (`Some(None)`) from a missing one (`None`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Contact service.
///
/// Every operation takes the owner explicitly; there is no ambient identity.
pub struct ContactService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ContactService<'a, S>
where
    S: ContactStore + ?Sized,
{
    /// Create a new contact service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All contacts of `owner`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::Repository` if the database operation fails.
    pub async fn list(&self, owner: UserId) -> Result<Vec<Contact>, ContactError> {
        Ok(self.store.list_contacts(owner).await?)
    }

    /// One contact of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::NotFound` if it does not exist or belongs to
    /// someone else.
    pub async fn get(&self, owner: UserId, id: ContactId) -> Result<Contact, ContactError> {
        self.store
            .get_contact(owner, id)
            .await?
            .ok_or(ContactError::NotFound)
    }

    /// Create a contact for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::Validation` for malformed input and
    /// `ContactError::DuplicateContact` if `owner` already has a contact with
    /// this name.
    pub async fn create(
        &self,
        owner: UserId,
        input: ContactInput,
    ) -> Result<Contact, ContactError> {
        let contact = NewContact {
            name: ContactName::parse(&input.name)?,
            phone: normalize_detail("phone", input.phone)?,
            email: normalize_detail("email", input.email)?,
            notes: normalize_detail("notes", input.notes)?,
        };

        let created = self
            .store
            .insert_contact(owner, &contact)
            .await
            .map_err(|e| duplicate_or(e, &contact.name))?;

        tracing::info!(owner = %owner, contact_id = %created.id, "Contact created");
        Ok(created)
    }

    /// Apply a partial update to a contact of `owner`.
    ///
    /// Renaming a contact to its current name is not a collision.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::NotFound` if the contact does not exist for
    /// `owner`, `ContactError::Validation` for malformed input and
    /// `ContactError::DuplicateContact` if the new name is already used by
    /// another of the owner's contacts.
    pub async fn update(
        &self,
        owner: UserId,
        id: ContactId,
        input: ContactUpdateInput,
    ) -> Result<Contact, ContactError> {
        let changes = ContactChanges {
            name: input.name.as_deref().map(ContactName::parse).transpose()?,
            phone: normalize_change("phone", input.phone)?,
            email: normalize_change("email", input.email)?,
            notes: normalize_change("notes", input.notes)?,
        };

        if changes.is_empty() {
            return self.get(owner, id).await;
        }

        let updated = match self.store.update_contact(owner, id, &changes).await {
            Ok(updated) => updated,
            Err(e) => {
                return Err(match &changes.name {
                    Some(name) => duplicate_or(e, name),
                    None => e.into(),
                });
            }
        };

        let updated = updated.ok_or(ContactError::NotFound)?;
        tracing::info!(owner = %owner, contact_id = %id, "Contact updated");
        Ok(updated)
    }

    /// Delete a contact of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::NotFound` if it does not exist or belongs to
    /// someone else.
    pub async fn delete(&self, owner: UserId, id: ContactId) -> Result<(), ContactError> {
        if !self.store.delete_contact(owner, id).await? {
            return Err(ContactError::NotFound);
        }

        tracing::info!(owner = %owner, contact_id = %id, "Contact deleted");
        Ok(())
    }
}

fn duplicate_or(err: RepositoryError, name: &ContactName) -> ContactError {
    match err {
        RepositoryError::Conflict(_) => ContactError::DuplicateContact {
            name: name.as_str().to_owned(),
        },
        other => ContactError::Repository(other),
    }
}

/// Trim a detail field; blank becomes absent.
fn normalize_detail(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ContactError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.chars().count() > MAX_DETAIL_LENGTH {
        return Err(ContactError::Validation(format!(
            "{field}: must be at most {MAX_DETAIL_LENGTH} characters"
        )));
    }

    Ok(Some(trimmed.to_owned()))
}

fn normalize_change(
    field: &'static str,
    change: Option<Option<String>>,
) -> Result<Option<Option<String>>, ContactError> {
    change.map(|value| normalize_detail(field, value)).transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::MemoryStore;

    const ALICE: UserId = UserId::new(1);
    const CAROL: UserId = UserId::new(2);

    fn input(name: &str, phone: &str) -> ContactInput {
        ContactInput {
            name: name.to_owned(),
            phone: Some(phone.to_owned()),
            ..ContactInput::default()
        }
    }

    fn rename(name: &str) -> ContactUpdateInput {
        ContactUpdateInput {
            name: Some(name.to_owned()),
            ..ContactUpdateInput::default()
        }
    }

    #[tokio::test]
    async fn test_same_owner_same_name_succeeds_once() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);

        let bob = service.create(ALICE, input("Bob", "123")).await.unwrap();
        assert_eq!(bob.name.as_str(), "Bob");
        assert_eq!(bob.phone.as_deref(), Some("123"));

        let err = service.create(ALICE, input("Bob", "456")).await.unwrap_err();
        assert!(matches!(err, ContactError::DuplicateContact { ref name } if name == "Bob"));

        let carols = service.create(CAROL, input("Bob", "789")).await.unwrap();
        assert_eq!(carols.owner_id, CAROL);
        assert_ne!(carols.id, bob.id);
    }

    #[tokio::test]
    async fn test_duplicate_detected_after_trimming() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);

        service.create(ALICE, input("Bob", "1")).await.unwrap();
        let err = service.create(ALICE, input("  Bob ", "2")).await.unwrap_err();

        assert!(matches!(err, ContactError::DuplicateContact { .. }));
    }

    #[tokio::test]
    async fn test_names_are_case_sensitive() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);

        service.create(ALICE, input("Bob", "1")).await.unwrap();
        assert!(service.create(ALICE, input("bob", "2")).await.is_ok());
    }

    #[tokio::test]
    async fn test_rename_rules() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);

        let bob = service.create(ALICE, input("Bob", "1")).await.unwrap();
        let dave = service.create(ALICE, input("Dave", "2")).await.unwrap();
        service.create(CAROL, input("Erin", "3")).await.unwrap();

        // Collides with the owner's other contact
        let err = service.update(ALICE, dave.id, rename("Bob")).await.unwrap_err();
        assert!(matches!(err, ContactError::DuplicateContact { ref name } if name == "Bob"));

        // Its own current name
        let same = service.update(ALICE, bob.id, rename("Bob")).await.unwrap();
        assert_eq!(same.name.as_str(), "Bob");

        // A name only another owner holds
        let erin = service.update(ALICE, dave.id, rename("Erin")).await.unwrap();
        assert_eq!(erin.name.as_str(), "Erin");
    }

    #[tokio::test]
    async fn test_foreign_contact_is_not_found() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);
        let bob = service.create(ALICE, input("Bob", "1")).await.unwrap();

        assert!(matches!(
            service.get(CAROL, bob.id).await,
            Err(ContactError::NotFound)
        ));
        assert!(matches!(
            service.update(CAROL, bob.id, rename("Robert")).await,
            Err(ContactError::NotFound)
        ));
        assert!(matches!(
            service.update(CAROL, bob.id, ContactUpdateInput::default()).await,
            Err(ContactError::NotFound)
        ));
        assert!(matches!(
            service.delete(CAROL, bob.id).await,
            Err(ContactError::NotFound)
        ));

        assert_eq!(service.get(ALICE, bob.id).await.unwrap(), bob);
    }

    #[tokio::test]
    async fn test_partial_update_and_clearing() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);
        let created = service
            .create(
                ALICE,
                ContactInput {
                    name: "Bob".to_owned(),
                    phone: Some("123".to_owned()),
                    email: Some("bob@example.com".to_owned()),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let updated = service
            .update(
                ALICE,
                created.id,
                ContactUpdateInput {
                    phone: Some(None),
                    notes: Some(Some("met at conf".to_owned())),
                    ..ContactUpdateInput::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_str(), "Bob");
        assert_eq!(updated.phone, None);
        assert_eq!(updated.email.as_deref(), Some("bob@example.com"));
        assert_eq!(updated.notes.as_deref(), Some("met at conf"));
    }

    #[tokio::test]
    async fn test_validation() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);

        assert!(matches!(
            service.create(ALICE, input("   ", "1")).await,
            Err(ContactError::Validation(_))
        ));
        assert!(matches!(
            service
                .create(ALICE, input("Bob", &"9".repeat(MAX_DETAIL_LENGTH + 1)))
                .await,
            Err(ContactError::Validation(_))
        ));

        let blank = service.create(ALICE, input("Bob", "   ")).await.unwrap();
        assert_eq!(blank.phone, None);
        assert_eq!(store.contact_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_recreate() {
        let store = MemoryStore::new();
        let service = ContactService::new(&store);

        let bob = service.create(ALICE, input("Bob", "1")).await.unwrap();
        service.delete(ALICE, bob.id).await.unwrap();

        assert!(matches!(
            service.delete(ALICE, bob.id).await,
            Err(ContactError::NotFound)
        ));
        assert!(service.create(ALICE, input("Bob", "2")).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_creates_single_winner() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    ContactService::new(store.as_ref())
                        .create(ALICE, input("Bob", &i.to_string()))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(ContactError::DuplicateContact { .. }) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!((created, duplicates), (1, 7));
    }

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let parsed: ContactUpdateInput =
            serde_json::from_str(r#"{"phone": null, "email": "x@y.z"}"#).unwrap();

        assert_eq!(parsed.name, None);
        assert_eq!(parsed.phone, Some(None));
        assert_eq!(parsed.email, Some(Some("x@y.z".to_owned())));
        assert_eq!(parsed.notes, None);
    }
}
