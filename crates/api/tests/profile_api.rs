//! HTTP-level tests for the caller's profile.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, put_json, token_for, token_with_email, Fakes};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn profile_requires_a_token() {
    let app = build_test_app(Fakes::default());

    let response = get(&app.router, "/api/profile", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn first_read_creates_profile_from_token_email() {
    let app = build_test_app(Fakes::default());
    let user = Uuid::new_v4();
    let token = token_with_email(user, "ada@example.com");

    let response = get(&app.router, "/api/profile", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let profile = &body_json(response).await["data"];
    assert_eq!(profile["id"], user.to_string());
    assert_eq!(profile["email"], "ada@example.com");
    assert!(profile["username"].is_null());
    assert!(profile["created_at"].is_string());
}

#[tokio::test]
async fn token_without_email_gets_a_null_email() {
    let app = build_test_app(Fakes::default());
    let token = token_for(Uuid::new_v4());

    let json = body_json(get(&app.router, "/api/profile", Some(&token)).await).await;

    assert!(json["data"]["email"].is_null());
}

#[tokio::test]
async fn update_is_partial_and_trimmed() {
    let app = build_test_app(Fakes::default());
    let token = token_with_email(Uuid::new_v4(), "ada@example.com");

    let response = put_json(
        &app.router,
        "/api/profile",
        Some(&token),
        json!({ "username": "  ada ", "avatar_url": "https://cdn.test/ada.png" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = &body_json(response).await["data"];
    assert_eq!(profile["username"], "ada");
    assert_eq!(profile["avatar_url"], "https://cdn.test/ada.png");
    assert_eq!(profile["email"], "ada@example.com");

    let response = put_json(
        &app.router,
        "/api/profile",
        Some(&token),
        json!({ "full_name": "Ada Lovelace" }),
    )
    .await;
    let profile = &body_json(response).await["data"];
    assert_eq!(profile["full_name"], "Ada Lovelace");
    assert_eq!(profile["username"], "ada");

    let fetched = body_json(get(&app.router, "/api/profile", Some(&token)).await).await;
    assert_eq!(fetched["data"]["full_name"], "Ada Lovelace");
}

#[tokio::test]
async fn invalid_fields_are_rejected() {
    let app = build_test_app(Fakes::default());
    let token = token_for(Uuid::new_v4());

    let response = put_json(
        &app.router,
        "/api/profile",
        Some(&token),
        json!({ "avatar_url": "javascript:alert(1)" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = put_json(
        &app.router,
        "/api/profile",
        Some(&token),
        json!({ "username": 42 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    // Nothing was stored by the rejected updates.
    let fetched = body_json(get(&app.router, "/api/profile", Some(&token)).await).await;
    assert!(fetched["data"]["avatar_url"].is_null());
}

#[tokio::test]
async fn profiles_are_per_caller() {
    let app = build_test_app(Fakes::default());
    let alice = token_for(Uuid::new_v4());
    let bob = token_for(Uuid::new_v4());

    put_json(&app.router, "/api/profile", Some(&alice), json!({ "username": "alice" })).await;

    let json = body_json(get(&app.router, "/api/profile", Some(&bob)).await).await;
    assert!(json["data"]["username"].is_null());
}
