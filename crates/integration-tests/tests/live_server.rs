//! Smoke tests against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API running (cargo run -p contacts-api)
//!
//! Run with: cargo test -p contacts-integration-tests -- --ignored live

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
fn base_url() -> String {
    std::env::var("CONTACTS_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Register a throwaway account and return its bearer token.
async fn login(client: &Client) -> String {
    let base_url = base_url();
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
    let username = format!("it_{suffix}");
    let credentials = json!({ "username": username, "password": "integration-pass" });

    let resp = client
        .post(format!("{base_url}/api/users/register"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base_url}/api/users/login"))
        .json(&credentials)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_owned()
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_live_root() {
    let resp = reqwest::get(base_url()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "API OK");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_live_duplicate_contact() {
    let client = Client::new();
    let token = login(&client).await;
    let url = format!("{}/api/contacts", base_url());

    let first = client
        .post(&url)
        .bearer_auth(&token)
        .json(&json!({ "name": "Bob", "phone": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(&url)
        .bearer_auth(&token)
        .json(&json!({ "name": "Bob", "phone": "456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_contact");
    assert_eq!(body["name"], "Bob");
}
