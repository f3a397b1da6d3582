//! Tests for the `/health` endpoint and the shared middleware stack.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, Fakes};

#[tokio::test]
async fn health_reports_ok_with_memory_store() {
    let app = build_test_app(Fakes::default());

    let response = get(&app.router, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
    assert_eq!(json["store_healthy"], true);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn health_reports_missing_credentials() {
    let app = build_test_app(Fakes::default());

    let json = body_json(get(&app.router, "/health", None).await).await;

    // The test config carries no provider credentials.
    assert_eq!(json["image_provider_configured"], false);
    assert_eq!(json["text_provider_configured"], false);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = build_test_app(Fakes::default());

    let response = get(&app.router, "/health", None).await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app(Fakes::default());

    let response = get(&app.router, "/api/nope", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}
