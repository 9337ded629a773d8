//! Account and token flows over HTTP, against the in-memory store.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};

use contacts_integration_tests::{TEST_PASSWORD, TestApp};

#[tokio::test]
async fn test_root_and_health() {
    let app = TestApp::new();

    let root = app.call(Method::GET, "/", None, None).await;
    assert_eq!(root.status, StatusCode::OK);
    assert_eq!(root.body, "API OK");

    let health = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(health.body, "ok");

    let ready = app.call(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = TestApp::new();

    let registered = app.register("alice", TEST_PASSWORD).await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["username"], "alice");
    assert!(registered.body.get("password_hash").is_none());

    let login = app.login("alice", TEST_PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["token_type"], "Bearer");
    assert_eq!(login.body["user"]["id"], registered.body["id"]);
    assert!(login.body["expires_at"].is_string());
    let token = login.body["token"].as_str().unwrap().to_owned();

    let me = app.call(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");

    let logout = app
        .call(Method::POST, "/api/users/logout", Some(&token), None)
        .await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);

    let after = app.call(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = TestApp::new();

    assert_eq!(
        app.register("alice", TEST_PASSWORD).await.status,
        StatusCode::CREATED
    );

    let again = app.register("alice", "another-password").await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "conflict");
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let app = TestApp::new();
    app.register("alice", TEST_PASSWORD).await;

    let wrong_password = app.login("alice", "wrong-password").await;
    let unknown_user = app.login("mallory", TEST_PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::new();

    let short_password = app.register("alice", "short").await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(short_password.body["error"], "validation");

    let bad_username = app.register("a b", TEST_PASSWORD).await;
    assert_eq!(bad_username.status, StatusCode::BAD_REQUEST);

    let not_json = app
        .call(Method::POST, "/api/users/register", None, None)
        .await;
    assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_requires_a_token() {
    let app = TestApp::new();

    let response = app.call(Method::POST, "/api/users/logout", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();

    let response = app.call(Method::GET, "/health", None, None).await;
    assert!(response.headers.contains_key("x-request-id"));
}
