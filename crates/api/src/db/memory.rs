//! In-process [`Store`] for tests.
//!
//! State sits behind one mutex. Each operation performs its uniqueness check
//! and its write under a single lock acquisition, mirroring the atomic
//! check-and-insert of a unique index.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use contacts_core::{ContactId, UserId, Username};

use super::indexes::DECLARED_INDEXES;
use super::{
    ContactStore, IndexSyncError, IndexSyncReport, RepositoryError, SessionStore, Store, UserStore,
};
use crate::models::{Contact, ContactChanges, NewContact, User};

#[derive(Debug, Default)]
struct Inner {
    next_user_id: i64,
    next_contact_id: i64,
    users: BTreeMap<UserId, (User, String)>,
    sessions: HashMap<String, (UserId, DateTime<Utc>)>,
    contacts: BTreeMap<ContactId, Contact>,
}

impl Inner {
    fn name_taken(&self, owner: UserId, name: &str, except: Option<ContactId>) -> bool {
        self.contacts.values().any(|c| {
            c.owner_id == owner && c.name.as_str() == name && Some(c.id) != except
        })
    }
}

/// A [`Store`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored contacts across all owners.
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.lock().contacts.len()
    }

    /// Number of live (not yet purged) sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.lock();

        if inner.users.values().any(|(u, _)| &u.username == username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        inner.next_user_id += 1;
        let user = User {
            id: UserId::new(inner.next_user_id),
            username: username.clone(),
            created_at: Utc::now(),
        };
        inner
            .users
            .insert(user.id, (user.clone(), password_hash.to_owned()));

        Ok(user)
    }

    async fn find_credentials(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|(u, _)| &u.username == username)
            .cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.lock()
            .sessions
            .insert(token_hash.to_owned(), (user_id, expires_at));
        Ok(())
    }

    async fn find_session_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let inner = self.lock();
        let user = inner
            .sessions
            .get(token_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .and_then(|(user_id, _)| inner.users.get(user_id))
            .map(|(u, _)| u.clone());
        Ok(user)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        Ok(self.lock().sessions.remove(token_hash).is_some())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.sessions.len();
        inner.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(u64::try_from(before - inner.sessions.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self, owner: UserId) -> Result<Vec<Contact>, RepositoryError> {
        let mut contacts: Vec<Contact> = self
            .lock()
            .contacts
            .values()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect();
        contacts.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(contacts)
    }

    async fn get_contact(
        &self,
        owner: UserId,
        id: ContactId,
    ) -> Result<Option<Contact>, RepositoryError> {
        Ok(self
            .lock()
            .contacts
            .get(&id)
            .filter(|c| c.owner_id == owner)
            .cloned())
    }

    async fn insert_contact(
        &self,
        owner: UserId,
        contact: &NewContact,
    ) -> Result<Contact, RepositoryError> {
        let mut inner = self.lock();

        if inner.name_taken(owner, contact.name.as_str(), None) {
            return Err(RepositoryError::Conflict(
                "contact name already exists for owner".to_owned(),
            ));
        }

        inner.next_contact_id += 1;
        let now = Utc::now();
        let stored = Contact {
            id: ContactId::new(inner.next_contact_id),
            owner_id: owner,
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            notes: contact.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.contacts.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn update_contact(
        &self,
        owner: UserId,
        id: ContactId,
        changes: &ContactChanges,
    ) -> Result<Option<Contact>, RepositoryError> {
        let mut inner = self.lock();

        if !inner.contacts.get(&id).is_some_and(|c| c.owner_id == owner) {
            return Ok(None);
        }

        if let Some(name) = &changes.name
            && inner.name_taken(owner, name.as_str(), Some(id))
        {
            return Err(RepositoryError::Conflict(
                "contact name already exists for owner".to_owned(),
            ));
        }

        let Some(contact) = inner.contacts.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(contact);
        contact.updated_at = Utc::now();

        Ok(Some(contact.clone()))
    }

    async fn delete_contact(&self, owner: UserId, id: ContactId) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();

        if inner.contacts.get(&id).is_some_and(|c| c.owner_id == owner) {
            inner.contacts.remove(&id);
            return Ok(true);
        }

        Ok(false)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn sync_indexes(&self) -> Result<IndexSyncReport, IndexSyncError> {
        // Uniqueness is enforced inline by every write.
        Ok(IndexSyncReport {
            created: Vec::new(),
            existing: DECLARED_INDEXES.iter().map(|i| i.name).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use contacts_core::ContactName;

    use super::*;

    fn new_contact(name: &str) -> NewContact {
        NewContact {
            name: ContactName::parse(name).unwrap(),
            phone: None,
            email: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_same_owner_same_name() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);

        store.insert_contact(owner, &new_contact("Bob")).await.unwrap();
        let err = store
            .insert_contact(owner, &new_contact("Bob"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.contact_count(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_names_by_bytes() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        for name in ["bob", "alice", "Bob", "Émile"] {
            store.insert_contact(owner, &new_contact(name)).await.unwrap();
        }

        let names: Vec<_> = store
            .list_contacts(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name.into_inner())
            .collect();

        assert_eq!(names, ["Bob", "alice", "bob", "Émile"]);
    }

    #[tokio::test]
    async fn test_rename_excludes_self() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let bob = store.insert_contact(owner, &new_contact("Bob")).await.unwrap();

        let changes = ContactChanges {
            name: Some(ContactName::parse("Bob").unwrap()),
            ..ContactChanges::default()
        };
        let updated = store.update_contact(owner, bob.id, &changes).await.unwrap();

        assert!(updated.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let owner = UserId::new(9);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert_contact(owner, &new_contact("Bob")).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, RepositoryError::Conflict(_))),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.contact_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible_and_purged() {
        let store = MemoryStore::new();
        let user = store
            .create_user(&Username::parse("alice").unwrap(), "hash")
            .await
            .unwrap();
        let now = Utc::now();

        store
            .create_session(user.id, "old", now - Duration::minutes(1))
            .await
            .unwrap();
        store
            .create_session(user.id, "fresh", now + Duration::hours(1))
            .await
            .unwrap();

        assert!(store.find_session_user("old", now).await.unwrap().is_none());
        assert_eq!(
            store.find_session_user("fresh", now).await.unwrap(),
            Some(user)
        );
        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 1);
        assert_eq!(store.session_count(), 1);
    }
}
