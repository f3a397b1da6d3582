//! Provider seams used by the chat engine and the HTTP handlers.
//!
//! Each provider is reached through a trait object so a missing credential
//! can be represented by an [`Unconfigured`] stand-in that fails every call
//! with the configuration error detected at startup.

use async_trait::async_trait;
use muse_core::image_request::GenerationRequest;
use tokio_util::sync::CancellationToken;

use crate::bridge::{GenerationError, GenerationResult, JobBridge};
use crate::openai::OpenAiError;
use crate::replicate::JobApi;

/// Primary image provider.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Label used in assistant replies, e.g. `Imagen-4`.
    fn label(&self) -> &str;

    /// Model name recorded as `model_used`.
    fn model_name(&self) -> &str;

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError>;
}

/// Text reply provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OpenAiError>;
}

/// Secondary image provider, tried when the primary one fails.
#[async_trait]
pub trait FallbackImageGenerator: Send + Sync {
    fn label(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Generate an image and return its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, OpenAiError>;
}

#[async_trait]
impl<A: JobApi> ImageGenerator for JobBridge<A> {
    fn label(&self) -> &str {
        &self.model().label
    }

    fn model_name(&self) -> &str {
        &self.model().name
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        JobBridge::generate(self, request, cancel).await
    }
}

/// Provider whose credential is missing.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    label: String,
    model_name: String,
    reason: String,
}

impl Unconfigured {
    pub fn new(
        label: impl Into<String>,
        model_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            model_name: model_name.into(),
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl ImageGenerator for Unconfigured {
    fn label(&self) -> &str {
        &self.label
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
        _cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        Err(GenerationError::Configuration(self.reason.clone()))
    }
}

#[async_trait]
impl TextGenerator for Unconfigured {
    async fn complete(&self, _prompt: &str) -> Result<String, OpenAiError> {
        Err(OpenAiError::NotConfigured(self.reason.clone()))
    }
}

#[async_trait]
impl FallbackImageGenerator for Unconfigured {
    fn label(&self) -> &str {
        &self.label
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String, OpenAiError> {
        Err(OpenAiError::NotConfigured(self.reason.clone()))
    }
}
