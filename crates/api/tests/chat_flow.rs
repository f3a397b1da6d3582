//! End-to-end tests of chat message processing: intent routing, the image
//! fallback chain and persisted error replies.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_conversation, get, post_json, token_for, Fakes,
    ImageOutcome, TestApp, TextOutcome, FALLBACK_URL, PRIMARY_URL, TEXT_REPLY,
};
use muse_core::chat::TEXT_UNCONFIGURED_REPLY;
use muse_providers::bridge::GenerationError;
use serde_json::{json, Value};
use uuid::Uuid;

fn remote_failure() -> GenerationError {
    GenerationError::RemoteFailure {
        prediction_id: "pred-test".into(),
        message: "NSFW content detected".into(),
    }
}

/// Send `body` to a fresh conversation and return the response JSON.
async fn send_message(app: &TestApp, body: Value) -> (String, i64, Value) {
    let token = token_for(Uuid::new_v4());
    let id = create_conversation(&app.router, &token, "Chat").await;

    let response = post_json(
        &app.router,
        &format!("/api/conversations/{id}/messages"),
        Some(&token),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (token, id, json["data"].clone())
}

// ---------------------------------------------------------------------------
// Text intent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn question_gets_a_text_reply() {
    let app = build_test_app(Fakes::default());

    let (token, id, exchange) =
        send_message(&app, json!({ "content": "What is the capital of France?" })).await;

    assert_eq!(exchange["user_message"]["role"], "user");
    assert_eq!(exchange["user_message"]["content"], "What is the capital of France?");
    assert_eq!(exchange["assistant_message"]["role"], "assistant");
    assert_eq!(exchange["assistant_message"]["message_type"], "text");
    assert_eq!(exchange["assistant_message"]["content"], TEXT_REPLY);
    assert_eq!(app.text.calls(), 1);
    assert_eq!(app.image.calls(), 0);

    let history = body_json(
        get(&app.router, &format!("/api/conversations/{id}/messages"), Some(&token)).await,
    )
    .await;
    let roles: Vec<&str> = history["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "assistant"]);
}

#[tokio::test]
async fn unconfigured_text_provider_apologizes() {
    let app = build_test_app(Fakes {
        text: TextOutcome::Unconfigured,
        ..Fakes::default()
    });

    let (_, _, exchange) = send_message(&app, json!({ "content": "Tell me a joke" })).await;

    assert_eq!(exchange["assistant_message"]["content"], TEXT_UNCONFIGURED_REPLY);
    assert!(exchange["assistant_message"]["metadata"].is_null());
}

#[tokio::test]
async fn failed_text_reply_is_persisted_as_error() {
    let app = build_test_app(Fakes {
        text: TextOutcome::Fail,
        ..Fakes::default()
    });

    let (_, _, exchange) = send_message(&app, json!({ "content": "Tell me a joke" })).await;

    let reply = &exchange["assistant_message"];
    assert_eq!(reply["message_type"], "text");
    assert!(reply["content"]
        .as_str()
        .unwrap()
        .starts_with("Sorry, I encountered an error: "));
    assert_eq!(reply["metadata"]["error_kind"], "text_generation");
}

#[tokio::test]
async fn blank_message_is_rejected_and_not_stored() {
    let app = build_test_app(Fakes::default());
    let token = token_for(Uuid::new_v4());
    let id = create_conversation(&app.router, &token, "Chat").await;
    let path = format!("/api/conversations/{id}/messages");

    let response = post_json(&app.router, &path, Some(&token), json!({ "content": "  " })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    let history = body_json(get(&app.router, &path, Some(&token)).await).await;
    assert!(history["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn null_message_content_is_a_validation_error() {
    let app = build_test_app(Fakes::default());
    let token = token_for(Uuid::new_v4());
    let id = create_conversation(&app.router, &token, "Chat").await;
    let path = format!("/api/conversations/{id}/messages");

    let response = post_json(&app.router, &path, Some(&token), json!({ "content": null })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(app.text.calls(), 0);
}

// ---------------------------------------------------------------------------
// Image intent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_request_uses_primary_provider() {
    let app = build_test_app(Fakes::default());

    let (token, id, exchange) = send_message(&app, json!({ "content": "draw a cat" })).await;

    let reply = &exchange["assistant_message"];
    assert_eq!(reply["message_type"], "image");
    assert_eq!(reply["image_url"], PRIMARY_URL);
    assert_eq!(
        reply["content"],
        "I've created a high-quality image using Imagen-4 based on your request: \"draw a cat\""
    );
    assert_eq!(reply["metadata"]["image_model"], "imagen-4");
    assert_eq!(reply["metadata"]["aspect_ratio"], "4:3");
    assert_eq!(reply["metadata"]["prediction_id"], "pred-test");
    assert_eq!(reply["metadata"]["generation_time_ms"], 1500);
    assert_eq!(app.fallback.calls(), 0);
    assert_eq!(app.text.calls(), 0);

    let log = body_json(get(&app.router, "/api/generated-images", Some(&token)).await).await;
    let images = log["data"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["conversation_id"], id);
    assert_eq!(images[0]["message_id"], reply["id"]);
}

#[tokio::test]
async fn explicit_settings_reach_the_provider() {
    let app = build_test_app(Fakes::default());

    let (_, _, exchange) = send_message(
        &app,
        json!({
            "content": "draw a lighthouse",
            "image_settings": { "aspect_ratio": "9:16", "output_format": "webp" }
        }),
    )
    .await;

    let metadata = &exchange["assistant_message"]["metadata"];
    assert_eq!(metadata["aspect_ratio"], "9:16");
    assert_eq!(metadata["output_format"], "webp");
}

#[tokio::test]
async fn auto_aspect_ratio_follows_the_prompt() {
    let app = build_test_app(Fakes::default());

    let (_, _, exchange) = send_message(
        &app,
        json!({ "content": "draw a portrait of a queen", "auto_aspect_ratio": true }),
    )
    .await;

    assert_eq!(exchange["assistant_message"]["metadata"]["aspect_ratio"], "3:4");
}

#[tokio::test]
async fn primary_failure_falls_back() {
    let app = build_test_app(Fakes {
        image: ImageOutcome::Fail(remote_failure),
        ..Fakes::default()
    });

    let (token, _, exchange) = send_message(&app, json!({ "content": "draw a cat" })).await;

    let reply = &exchange["assistant_message"];
    assert_eq!(reply["message_type"], "image");
    assert_eq!(reply["image_url"], FALLBACK_URL);
    assert_eq!(
        reply["content"],
        "I've generated an image using DALL-E based on your request: \"draw a cat\" \
         (Imagen-4 was unavailable)"
    );
    assert_eq!(reply["metadata"]["fallback"], true);
    assert_eq!(reply["metadata"]["image_model"], "dall-e-3");
    assert_eq!(reply["metadata"]["primary_error_kind"], "remote_failure");
    assert_eq!(reply["metadata"]["aspect_ratio"], "4:3");
    assert_eq!(reply["metadata"]["safety_filter_level"], "block_medium_and_above");
    assert_eq!(reply["metadata"]["output_format"], "png");
    assert_eq!(app.image.calls(), 1);
    assert_eq!(app.fallback.calls(), 1);

    // Only primary images are logged.
    let log = body_json(get(&app.router, "/api/generated-images", Some(&token)).await).await;
    assert!(log["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn fallback_metadata_keeps_requested_settings() {
    let app = build_test_app(Fakes {
        image: ImageOutcome::Fail(remote_failure),
        ..Fakes::default()
    });

    let (_, _, exchange) = send_message(
        &app,
        json!({
            "content": "draw a skyline",
            "image_settings": { "aspect_ratio": "16:9", "output_format": "webp" },
        }),
    )
    .await;

    let metadata = &exchange["assistant_message"]["metadata"];
    assert_eq!(metadata["fallback"], true);
    assert_eq!(metadata["aspect_ratio"], "16:9");
    assert_eq!(metadata["safety_filter_level"], "block_medium_and_above");
    assert_eq!(metadata["output_format"], "webp");
}

#[tokio::test]
async fn both_image_providers_failing_persists_error_reply() {
    let app = build_test_app(Fakes {
        image: ImageOutcome::Fail(remote_failure),
        fallback_succeeds: false,
        ..Fakes::default()
    });

    let (_, _, exchange) = send_message(&app, json!({ "content": "draw a cat" })).await;

    let reply = &exchange["assistant_message"];
    assert_eq!(reply["message_type"], "text");
    assert!(reply["image_url"].is_null());
    assert_eq!(
        reply["content"],
        "Sorry, I encountered an error: Image generation is currently unavailable. \
         Please try again later."
    );
    assert_eq!(reply["metadata"]["error_kind"], "remote_failure");
    assert_eq!(reply["metadata"]["primary_error"], "NSFW content detected");
}

#[tokio::test]
async fn shutdown_abandons_image_without_fallback() {
    let app = build_test_app(Fakes {
        image: ImageOutcome::WaitForCancel,
        ..Fakes::default()
    });
    let token = token_for(Uuid::new_v4());
    let id = create_conversation(&app.router, &token, "Chat").await;

    let router = app.router.clone();
    let pending_token = token.clone();
    let pending = tokio::spawn(async move {
        post_json(
            &router,
            &format!("/api/conversations/{id}/messages"),
            Some(&pending_token),
            json!({ "content": "draw a cat" }),
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    app.state.shutdown.cancel();

    let response = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("request should finish after shutdown")
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let exchange = body_json(response).await;
    assert_eq!(
        exchange["data"]["assistant_message"]["metadata"]["error_kind"],
        "abandoned"
    );
    assert_eq!(app.fallback.calls(), 0);
}
