//! `PostgreSQL` contact queries.
//!
//! Uniqueness of `(owner_id, name)` is never probed here. Inserts and renames
//! go straight to the engine, and the unique index declared in
//! [`super::indexes`] rejects duplicates inside the same statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use contacts_core::{ContactId, ContactName, UserId};

use super::{ContactStore, PgStore, RepositoryError, map_unique_violation};
use crate::models::{Contact, ContactChanges, NewContact};

const DUPLICATE_CONTACT: &str = "contact name already exists for owner";

/// Internal row type for `contact` queries.
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i64,
    owner_id: i64,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let name = ContactName::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid contact name in database: {e}"))
        })?;

        Ok(Self {
            id: ContactId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            name,
            phone: row.phone,
            email: row.email,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self, owner: UserId) -> Result<Vec<Contact>, RepositoryError> {
        // Byte order, matching `ContactName`'s `Ord`
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, owner_id, name, phone, email, notes, created_at, updated_at
            FROM contact
            WHERE owner_id = $1
            ORDER BY name COLLATE "C" ASC, id ASC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_contact(
        &self,
        owner: UserId,
        id: ContactId,
    ) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, owner_id, name, phone, email, notes, created_at, updated_at
            FROM contact
            WHERE id = $1 AND owner_id = $2
            ",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool())
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_contact(
        &self,
        owner: UserId,
        contact: &NewContact,
    ) -> Result<Contact, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO contact (owner_id, name, phone, email, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, phone, email, notes, created_at, updated_at
            ",
        )
        .bind(owner)
        .bind(&contact.name)
        .bind(contact.phone.as_deref())
        .bind(contact.email.as_deref())
        .bind(contact.notes.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_unique_violation(e, DUPLICATE_CONTACT))?;

        row.try_into()
    }

    async fn update_contact(
        &self,
        owner: UserId,
        id: ContactId,
        changes: &ContactChanges,
    ) -> Result<Option<Contact>, RepositoryError> {
        // Each detail column takes a (touched, value) pair so an explicit
        // null can clear it while an absent field leaves it alone.
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            UPDATE contact
            SET name       = COALESCE($3::text, name),
                phone      = CASE WHEN $4::boolean THEN $5::text ELSE phone END,
                email      = CASE WHEN $6::boolean THEN $7::text ELSE email END,
                notes      = CASE WHEN $8::boolean THEN $9::text ELSE notes END,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, name, phone, email, notes, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(owner)
        .bind(changes.name.as_ref().map(ContactName::as_str))
        .bind(changes.phone.is_some())
        .bind(changes.phone.clone().flatten())
        .bind(changes.email.is_some())
        .bind(changes.email.clone().flatten())
        .bind(changes.notes.is_some())
        .bind(changes.notes.clone().flatten())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_unique_violation(e, DUPLICATE_CONTACT))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete_contact(&self, owner: UserId, id: ContactId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM contact WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
