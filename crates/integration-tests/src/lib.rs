//! Integration tests for the contacts API.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process HTTP tests (no database needed)
//! cargo test -p contacts-integration-tests
//!
//! # Include PostgreSQL-backed tests
//! CONTACTS_TEST_DATABASE_URL=postgres://localhost/contacts_test \
//!     cargo test -p contacts-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `contacts_api` / `users_api` - Full router over [`MemoryStore`]
//! - `postgres_store` - `PgStore` and index sync against a real database,
//!   each test in its own throwaway schema
//! - `live_server` - A running server at `CONTACTS_BASE_URL`

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use contacts_api::config::ApiConfig;
use contacts_api::db::MemoryStore;
use contacts_api::state::AppState;

/// Password used by [`TestApp::login_as`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A response with its body decoded.
///
/// JSON bodies become their value, other non-empty bodies a JSON string, and
/// empty bodies `null`.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// The full router over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    /// Build an app with default configuration and rate limiting disabled.
    ///
    /// # Panics
    ///
    /// Panics if the fixed test configuration is rejected.
    #[must_use]
    pub fn new() -> Self {
        let config = ApiConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_owned()),
            "API_RATE_LIMIT" => Some("false".to_owned()),
            _ => None,
        })
        .expect("test configuration is valid");

        let store = Arc::new(MemoryStore::new());
        let router = contacts_api::app(AppState::new(config, store.clone()));

        Self { router, store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request is valid");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body is readable")
            .to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register an account.
    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Log in.
    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register `username` with [`TEST_PASSWORD`] and return a bearer token.
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    pub async fn login_as(&self, username: &str) -> String {
        let registered = self.register(username, TEST_PASSWORD).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let login = self.login(username, TEST_PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);

        login.body["token"]
            .as_str()
            .expect("login returns a token")
            .to_owned()
    }

    /// Create a contact as the token's owner.
    pub async fn create_contact(&self, token: &str, body: Value) -> TestResponse {
        self.call(Method::POST, "/api/contacts", Some(token), Some(body))
            .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
