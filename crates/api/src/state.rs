use std::sync::Arc;

use muse_core::intent::{IntentClassifier, KeywordClassifier};
use muse_db::store::ConversationStore;
use muse_providers::bridge::JobBridge;
use muse_providers::generator::{
    FallbackImageGenerator, ImageGenerator, TextGenerator, Unconfigured,
};
use muse_providers::openai::OpenAiClient;
use muse_providers::replicate::ReplicateApi;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::ServerConfig;
use crate::engine::chat::ChatEngine;

/// Outbound providers, constructed once from the validated configuration.
#[derive(Clone)]
pub struct Providers {
    /// Primary image provider (job bridge).
    pub image: Arc<dyn ImageGenerator>,
    pub text: Arc<dyn TextGenerator>,
    /// Secondary image provider used by the chat fallback.
    pub fallback_image: Arc<dyn FallbackImageGenerator>,
}

impl Providers {
    /// Build clients for configured credentials and [`Unconfigured`]
    /// stand-ins for missing ones. All clients share `http`.
    pub fn from_config(config: &ServerConfig, http: reqwest::Client) -> Self {
        let image: Arc<dyn ImageGenerator> = match config.image.credential.token() {
            Ok(token) => Arc::new(JobBridge::new(
                ReplicateApi::with_client(http.clone(), config.image.api_url.clone(), token),
                config.image.model.clone(),
                config.image.poll.clone(),
            )),
            Err(err) => {
                tracing::warn!(error = %err, "Primary image provider disabled");
                Arc::new(Unconfigured::new(
                    config.image.model.label.clone(),
                    config.image.model.name.clone(),
                    err.to_string(),
                ))
            }
        };

        let (text, fallback_image): (Arc<dyn TextGenerator>, Arc<dyn FallbackImageGenerator>) =
            match config.openai.credential.token() {
                Ok(key) => {
                    let client = Arc::new(
                        OpenAiClient::new(key)
                            .with_client(http)
                            .with_api_url(config.openai.api_url.clone())
                            .with_text_model(config.openai.text_model.clone())
                            .with_image_model(config.openai.image_model.clone()),
                    );
                    let text: Arc<dyn TextGenerator> = client.clone();
                    let fallback: Arc<dyn FallbackImageGenerator> = client;
                    (text, fallback)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Text and fallback image provider disabled");
                    let stand_in = Arc::new(Unconfigured::new(
                        "DALL-E",
                        config.openai.image_model.clone(),
                        err.to_string(),
                    ));
                    let text: Arc<dyn TextGenerator> = stand_in.clone();
                    let fallback: Arc<dyn FallbackImageGenerator> = stand_in;
                    (text, fallback)
                }
            };

        Self {
            image,
            text,
            fallback_image,
        }
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Conversation persistence (Postgres or in-memory).
    pub store: Arc<dyn ConversationStore>,
    pub config: Arc<ServerConfig>,
    pub providers: Providers,
    pub chat: Arc<ChatEngine>,
    /// Cancelled when the server shuts down; parent of every request token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        config: Arc<ServerConfig>,
        providers: Providers,
        shutdown: CancellationToken,
    ) -> Self {
        let classifier: Arc<dyn IntentClassifier> = Arc::new(KeywordClassifier);
        let chat = Arc::new(ChatEngine::new(providers.clone(), classifier));
        Self {
            store,
            config,
            providers,
            chat,
            shutdown,
        }
    }

    /// Cancellation token for one request.
    ///
    /// The token is cancelled on server shutdown or when the returned guard
    /// is dropped, i.e. when the request future goes away.
    pub fn request_cancellation(&self) -> (CancellationToken, DropGuard) {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (token, guard)
    }
}
