//! The 401 contract between the API and the dashboard client.
//!
//! The server's refusals are produced by the real bearer middleware; the
//! client's reactions are observed through its session context. None of these
//! routes touch the database.

#![allow(clippy::unwrap_used)]

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{Value, json};

use tillpoint_api::auth::TokenIssuer;
use tillpoint_client::{ApiClient, ApiError, SessionEvent, SessionState};
use tillpoint_core::{BusinessType, Role, Session};
use tillpoint_integration_tests::{TestApi, profile};

fn now() -> i64 {
    i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs(),
    )
    .unwrap()
}

async fn logged_in(api: &TestApi, token: String, role: Role) -> ApiClient {
    let client = api.client().await;
    client
        .session()
        .establish(Session::new(token, profile(7, "pat", role)))
        .await
        .unwrap();
    client
}

async fn raw_get(api: &TestApi, path: &str, authorization: Option<&str>) -> (StatusCode, Value) {
    let mut request = reqwest::Client::new().get(api.url(path));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    let response = request.send().await.unwrap();
    (response.status(), response.json().await.unwrap())
}

// ============================================================================
// Server side: exact refusal bodies
// ============================================================================

#[tokio::test]
async fn test_missing_token_body() {
    let api = TestApi::spawn().await;
    let (status, body) = raw_get(&api, "/api/auth/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"message": "Access token required", "code": "token_missing"})
    );
}

#[tokio::test]
async fn test_invalid_token_body() {
    let api = TestApi::spawn().await;
    let (status, body) = raw_get(&api, "/api/auth/me", Some("Bearer not-a-jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"message": "Invalid token", "code": "token_invalid"}));
}

#[tokio::test]
async fn test_expired_token_body() {
    let api = TestApi::spawn().await;
    let token = api
        .tokens
        .issue_with_expiry(&profile(1, "ann", Role::Admin), now() - 600, now() - 60)
        .unwrap();
    let (status, body) = raw_get(&api, "/api/auth/me", Some(&format!("Bearer {token}"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"message": "Token expired", "code": "token_expired"}));
}

#[tokio::test]
async fn test_health() {
    let api = TestApi::spawn().await;
    let response = reqwest::get(api.url("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

// ============================================================================
// Client side: reactions to those bodies
// ============================================================================

#[tokio::test]
async fn test_valid_token_returns_profile() {
    let api = TestApi::spawn().await;
    let token = api.tokens.issue(&profile(7, "pat", Role::Cashier)).unwrap();
    let client = logged_in(&api, token, Role::Cashier).await;

    let me = client.me().await.unwrap();

    assert_eq!(me, profile(7, "pat", Role::Cashier));
    assert!(client.session().session().await.is_some());
}

#[tokio::test]
async fn test_expired_token_ends_client_session() {
    let api = TestApi::spawn().await;
    let token = api
        .tokens
        .issue_with_expiry(&profile(7, "pat", Role::Admin), now() - 600, now() - 1)
        .unwrap();
    let client = logged_in(&api, token, Role::Admin).await;
    let mut events = client.session().subscribe();

    let err = client.me().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(client.session().state().await, SessionState::Anonymous);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Expired { .. }
    ));
}

#[tokio::test]
async fn test_foreign_token_ends_client_session() {
    let api = TestApi::spawn().await;
    let foreign = TokenIssuer::new(
        &SecretString::from("some-other-deployment-key-8f3k2m9x"),
        std::time::Duration::from_secs(60),
    );
    let token = foreign.issue(&profile(7, "pat", Role::Admin)).unwrap();
    let client = logged_in(&api, token, Role::Admin).await;
    let mut events = client.session().subscribe();

    let err = client.me().await.unwrap_err();

    assert!(matches!(err, ApiError::AuthenticationFailed));
    assert_eq!(client.session().token().await, None);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Rejected { .. }
    ));
}

#[tokio::test]
async fn test_anonymous_request_is_refused_as_authentication_failure() {
    let api = TestApi::spawn().await;
    let client = api.client().await;

    let err = client.me().await.unwrap_err();

    assert!(matches!(err, ApiError::AuthenticationFailed));
    assert_eq!(client.session().state().await, SessionState::Anonymous);
}

#[tokio::test]
async fn test_cashier_forbidden_from_setup_keeps_session() {
    let api = TestApi::spawn().await;
    let token = api.tokens.issue(&profile(7, "pat", Role::Cashier)).unwrap();
    let client = logged_in(&api, token.clone(), Role::Cashier).await;

    let err = client
        .save_business_type(&BusinessType::parse("Bakery").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        ApiError::RequestFailed { status: 403, message, .. } if message == "Admin access required"
    ));
    assert_eq!(client.session().token().await, Some(token));
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_login_is_rate_limited() {
    let api = TestApi::spawn_with(&[("RATE_LIMIT_MAX", "2")], true).await;
    let http = reqwest::Client::new();

    // Empty objects fail validation before any database access.
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = http
            .post(api.url("/api/auth/login"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );

    // Other routes are not limited.
    let (status, _) = raw_get(&api, "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
