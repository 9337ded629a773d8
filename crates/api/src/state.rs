//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Store;
use crate::services::{AuthService, ContactService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `store` - Storage backend (`PgStore` in production)
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Authentication service bound to this state's store.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_, dyn Store + '_> {
        AuthService::new(self.store(), self.inner.config.token_ttl)
    }

    /// Contact service bound to this state's store.
    #[must_use]
    pub fn contacts(&self) -> ContactService<'_, dyn Store + '_> {
        ContactService::new(self.store())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::ContactInput;

    fn state() -> AppState {
        let config = ApiConfig::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://unused".to_owned())
        })
        .unwrap();
        AppState::new(config, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_services_share_the_store() {
        let state = state();

        let user = state.auth().register("alice", "password123").await.unwrap();
        let created = state
            .contacts()
            .create(
                user.id,
                ContactInput {
                    name: "Bob".to_owned(),
                    phone: None,
                    email: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let listed = state.contacts().list(user.id).await.unwrap();
        assert_eq!(listed, vec![created]);
    }
}
