//! Contact domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use contacts_core::{ContactId, ContactName, UserId};

/// A contact owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// Generated contact ID.
    pub id: ContactId,
    /// The user who owns this contact.
    pub owner_id: UserId,
    /// Display name, unique per owner.
    pub name: ContactName,
    /// Free-form phone number.
    pub phone: Option<String>,
    /// Free-form email address.
    pub email: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the contact was created.
    pub created_at: DateTime<Utc>,
    /// When the contact was last modified.
    pub updated_at: DateTime<Utc>,
}

/// A validated contact ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: ContactName,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// A validated partial update.
///
/// `None` leaves a field untouched. For the detail fields, `Some(None)`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactChanges {
    pub name: Option<ContactName>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl ContactChanges {
    /// Returns true if the update touches no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none() && self.notes.is_none()
    }

    /// Apply the changes to a contact in place.
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            contact.phone.clone_from(phone);
        }
        if let Some(email) = &self.email {
            contact.email.clone_from(email);
        }
        if let Some(notes) = &self.notes {
            contact.notes.clone_from(notes);
        }
    }
}
