//! HTTP-level tests for registration, login and API-key management.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, get_auth, get_with_key, post_json, post_json_auth};
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Registration and login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_returns_member_and_one_time_key() {
    let app = build_test_app().await;

    let response = post_json(
        app.router(),
        "/api/v1/register",
        json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": common::PASSWORD,
            "tenant_id": app.tenant.id,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["data"]["api_key"].as_str().unwrap().starts_with("ak_"));
    assert_eq!(json["data"]["member"]["email"], "alice@example.com");
    assert_eq!(json["data"]["member"]["tenant_id"], app.tenant.id.to_string());
    assert!(json["data"]["member"].get("password_hash").is_none());
    assert!(json["data"]["member"].get("api_key_hash").is_none());
}

#[tokio::test]
async fn register_rejects_weak_password_and_duplicate_email() {
    let app = build_test_app().await;

    let response = post_json(
        app.router(),
        "/api/v1/register",
        json!({ "name": "Bob", "email": "bob@example.com", "password": "short" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.caller("bob@example.com").await;
    let response = post_json(
        app.router(),
        "/api/v1/register",
        json!({ "name": "Bob", "email": "bob@example.com", "password": common::PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_with_unknown_tenant_is_not_found() {
    let app = build_test_app().await;
    let response = post_json(
        app.router(),
        "/api/v1/register",
        json!({
            "name": "Carol",
            "email": "carol@example.com",
            "password": common::PASSWORD,
            "tenant_id": Uuid::nil(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_failures() {
    let app = build_test_app().await;
    let caller = app.caller("dave@example.com").await;

    let wrong_password = post_json(
        app.router(),
        "/api/v1/login",
        json!({ "email": "dave@example.com", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

    let unknown = post_json(
        app.router(),
        "/api/v1/login",
        json!({ "email": "ghost@example.com", "password": common::PASSWORD }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let other_tenant = post_json(
        app.router(),
        "/api/v1/login",
        json!({
            "email": "dave@example.com",
            "password": common::PASSWORD,
            "tenant_id": Uuid::nil(),
        }),
    )
    .await;
    assert_eq!(other_tenant.status(), StatusCode::UNAUTHORIZED);

    let member_id: Uuid = caller.member_id.parse().unwrap();
    app.store.set_member_active(member_id, false);
    let inactive = post_json(
        app.router(),
        "/api/v1/login",
        json!({ "email": "dave@example.com", "password": common::PASSWORD }),
    )
    .await;
    assert_eq!(inactive.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_requires_bearer_token() {
    let app = build_test_app().await;
    let caller = app.caller("erin@example.com").await;

    let response = get(app.router(), "/api/v1/profile").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app.router(), "/api/v1/profile", &caller.token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["member"]["id"], caller.member_id);
    assert_eq!(json["data"]["tenant"]["name"], "Acme");
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_key_accepts_both_header_forms() {
    let app = build_test_app().await;
    let caller = app.caller("frank@example.com").await;

    let response = get_with_key(app.router(), "/api/v1/auth/verify-key", &caller.api_key).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["member"]["id"], caller.member_id);
    assert_eq!(json["tenant"]["id"], app.tenant.id.to_string());

    let request = axum::http::Request::get("/api/v1/auth/verify-key")
        .header("authorization", format!("ApiKey {}", caller.api_key))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_unknown_key_is_unauthorized() {
    let app = build_test_app().await;

    let response = get(app.router(), "/api/v1/auth/verify-key").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = get_with_key(app.router(), "/api/v1/auth/verify-key", "ak_unknown").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn regenerated_key_replaces_the_old_one() {
    let app = build_test_app().await;
    let caller = app.caller("grace@example.com").await;

    let response = post_json_auth(
        app.router(),
        "/api/v1/auth/regenerate-key",
        &caller.token,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let new_key = body_json(response).await["data"]["api_key"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(new_key, caller.api_key);

    // The old key was never resolved, so no cache entry keeps it alive.
    let old = get_with_key(app.router(), "/api/v1/auth/verify-key", &caller.api_key).await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = get_with_key(app.router(), "/api/v1/auth/verify-key", &new_key).await;
    assert_eq!(new.status(), StatusCode::OK);
}
