//! OpenAI-compatible client for text replies and the secondary image
//! provider.

use async_trait::async_trait;
use serde::Deserialize;

use crate::generator::{FallbackImageGenerator, TextGenerator};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Returned as the reply when the completion carries no content.
pub const EMPTY_COMPLETION_REPLY: &str = "No response generated";

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "standard";

/// Errors from the OpenAI-compatible API layer.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    /// No API key was configured.
    #[error("{0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx answer; `message` is the body's `error.message` when present.
    #[error("OpenAI API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx answer without the expected payload.
    #[error("{0}")]
    EmptyResponse(String),
}

impl OpenAiError {
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

/// HTTP client for the chat-completions and image-generation endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Single-turn chat completion. Returns the first choice's content.
    pub async fn complete_text(&self, prompt: &str) -> Result<String, OpenAiError> {
        let body = serde_json::json!({
            "model": self.text_model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let completion: ChatCompletion = Self::parse_response(response).await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_string());
        Ok(content)
    }

    /// Generate one square image and return its URL.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, OpenAiError> {
        let body = serde_json::json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": IMAGE_SIZE,
            "quality": IMAGE_QUALITY,
        });

        let response = self
            .client
            .post(format!("{}/images/generations", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let images: ImagesResponse = Self::parse_response(response).await?;
        images
            .data
            .into_iter()
            .find_map(|d| d.url.filter(|u| !u.is_empty()))
            .ok_or_else(|| OpenAiError::EmptyResponse("No image URL returned from DALL-E".into()))
    }

    // ---- private helpers ----

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OpenAiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, OpenAiError> {
        self.complete_text(prompt).await
    }
}

#[async_trait]
impl FallbackImageGenerator for OpenAiClient {
    fn label(&self) -> &str {
        "DALL-E"
    }

    fn model_name(&self) -> &str {
        &self.image_model
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, OpenAiError> {
        OpenAiClient::generate_image(self, prompt).await
    }
}
