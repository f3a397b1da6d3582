#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use muse_api::auth::jwt::{encode_claims, generate_access_token, Claims};
use muse_api::config::ServerConfig;
use muse_api::router::build_app_router;
use muse_api::state::{AppState, Providers};
use muse_core::image_request::GenerationRequest;
use muse_core::types::UserId;
use muse_db::store::MemoryConversationStore;
use muse_providers::bridge::{GenerationError, GenerationResult, ImageMetadata};
use muse_providers::generator::{FallbackImageGenerator, ImageGenerator, TextGenerator};
use muse_providers::openai::OpenAiError;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const PRIMARY_URL: &str = "https://images.test/primary.png";
pub const FALLBACK_URL: &str = "https://images.test/fallback.png";
pub const TEXT_REPLY: &str = "Paris is the capital of France.";

/// Build a test `ServerConfig` from a fixed variable set plus `extra`.
///
/// No provider credentials are set unless `extra` provides them.
pub fn test_config_with(extra: &[(&str, &str)]) -> ServerConfig {
    let mut vars: Vec<(String, String)> = vec![
        ("JWT_SECRET".into(), TEST_JWT_SECRET.into()),
        ("CORS_ORIGINS".into(), "http://localhost:5173".into()),
        ("REQUEST_TIMEOUT_SECS".into(), "30".into()),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    ServerConfig::from_lookup(|name| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    })
    .expect("test config should load")
}

pub fn test_config() -> ServerConfig {
    test_config_with(&[])
}

/// Mint a valid access token for `user`.
pub fn token_for(user: UserId) -> String {
    generate_access_token(user, 3600, &test_config().jwt).expect("token should encode")
}

/// Mint a valid access token for `user` carrying an `email` claim.
pub fn token_with_email(user: UserId, email: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user,
        exp: now + 3600,
        iat: now,
        aud: None,
        email: Some(email.to_string()),
    };
    encode_claims(&claims, &test_config().jwt).expect("token should encode")
}

// ---------------------------------------------------------------------------
// Fake providers
// ---------------------------------------------------------------------------

/// Behaviour of the fake primary image provider.
pub enum ImageOutcome {
    Succeed,
    Fail(fn() -> GenerationError),
    /// Block until the request token is cancelled.
    WaitForCancel,
}

pub struct FakeImage {
    outcome: ImageOutcome,
    calls: AtomicUsize,
}

impl FakeImage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FakeImage {
    fn label(&self) -> &str {
        "Imagen-4"
    }

    fn model_name(&self) -> &str {
        "imagen-4"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            ImageOutcome::Succeed => Ok(GenerationResult {
                image_url: PRIMARY_URL.to_string(),
                prediction_id: "pred-test".to_string(),
                attempts: 2,
                elapsed: Duration::from_millis(1500),
                metadata: ImageMetadata::from_request(request, "imagen-4"),
            }),
            ImageOutcome::Fail(make) => Err(make()),
            ImageOutcome::WaitForCancel => {
                cancel.cancelled().await;
                Err(GenerationError::Abandoned {
                    prediction_id: Some("pred-test".to_string()),
                })
            }
        }
    }
}

/// Behaviour of the fake text provider.
pub enum TextOutcome {
    Reply,
    Unconfigured,
    Fail,
}

pub struct FakeText {
    outcome: TextOutcome,
    calls: AtomicUsize,
}

impl FakeText {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn complete(&self, _prompt: &str) -> Result<String, OpenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            TextOutcome::Reply => Ok(TEXT_REPLY.to_string()),
            TextOutcome::Unconfigured => Err(OpenAiError::NotConfigured(
                "OpenAI API key not configured".into(),
            )),
            TextOutcome::Fail => Err(OpenAiError::Api {
                status: 500,
                message: "upstream exploded".into(),
            }),
        }
    }
}

pub struct FakeFallback {
    succeed: bool,
    calls: AtomicUsize,
}

impl FakeFallback {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackImageGenerator for FakeFallback {
    fn label(&self) -> &str {
        "DALL-E"
    }

    fn model_name(&self) -> &str {
        "dall-e-3"
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String, OpenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            Ok(FALLBACK_URL.to_string())
        } else {
            Err(OpenAiError::Api {
                status: 400,
                message: "content policy violation".into(),
            })
        }
    }
}

/// Outcomes the fake providers are built with.
pub struct Fakes {
    pub image: ImageOutcome,
    pub text: TextOutcome,
    pub fallback_succeeds: bool,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            image: ImageOutcome::Succeed,
            text: TextOutcome::Reply,
            fallback_succeeds: true,
        }
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// The application router plus handles on its fakes and state.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub image: Arc<FakeImage>,
    pub text: Arc<FakeText>,
    pub fallback: Arc<FakeFallback>,
}

/// Build the full application router over an in-memory store and fake
/// providers, using the same middleware stack as `main.rs`.
pub fn build_test_app(fakes: Fakes) -> TestApp {
    let image = Arc::new(FakeImage {
        outcome: fakes.image,
        calls: AtomicUsize::new(0),
    });
    let text = Arc::new(FakeText {
        outcome: fakes.text,
        calls: AtomicUsize::new(0),
    });
    let fallback = Arc::new(FakeFallback {
        succeed: fakes.fallback_succeeds,
        calls: AtomicUsize::new(0),
    });

    let providers = Providers {
        image: image.clone(),
        text: text.clone(),
        fallback_image: fallback.clone(),
    };
    let config = Arc::new(test_config());
    let state = AppState::new(
        Arc::new(MemoryConversationStore::new()),
        Arc::clone(&config),
        providers,
        CancellationToken::new(),
    );
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        image,
        text,
        fallback,
    }
}

/// Build the router with real providers constructed from `config`.
pub fn build_configured_app(config: ServerConfig) -> Router {
    let providers = Providers::from_config(&config, reqwest::Client::new());
    let config = Arc::new(config);
    let state = AppState::new(
        Arc::new(MemoryConversationStore::new()),
        Arc::clone(&config),
        providers,
        CancellationToken::new(),
    );
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// Send a request whose body is sent verbatim as `application/json`.
pub async fn send_raw(app: &Router, method: Method, uri: &str, token: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::DELETE, uri, token, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a conversation for `token` and return its id.
pub async fn create_conversation(app: &Router, token: &str, title: &str) -> i64 {
    let response = post_json(
        app,
        "/api/conversations",
        Some(token),
        serde_json::json!({ "title": title }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}
