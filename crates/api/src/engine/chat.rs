//! Chat message processing.
//!
//! Persists the user's message, routes it to the image or text provider
//! based on the classified intent, and persists the assistant's reply.
//! Provider failures never fail the request: they become an assistant
//! text message whose metadata carries the error kind.

use std::sync::Arc;

use muse_core::chat::{
    error_reply, fallback_image_reply, primary_image_reply, validate_content,
    IMAGE_UNAVAILABLE_MESSAGE, MESSAGE_TYPE_IMAGE, ROLE_ASSISTANT, ROLE_USER,
    TEXT_UNCONFIGURED_REPLY,
};
use muse_core::image_request::{suggest_aspect_ratio, GenerationRequest, ImageSettings};
use muse_core::intent::{Intent, IntentClassifier};
use muse_core::types::DbId;
use muse_db::models::generated_image::NewGeneratedImage;
use muse_db::models::message::{Message, NewMessage};
use muse_db::store::OwnerScope;
use muse_providers::bridge::{GenerationError, GenerationErrorKind, GenerationResult};
use muse_providers::openai::OpenAiError;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::state::Providers;

/// A user message and the assistant reply it produced.
#[derive(Debug, Serialize)]
pub struct ChatExchange {
    pub user_message: Message,
    pub assistant_message: Message,
}

/// Options of one chat message.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageOptions {
    pub image_settings: ImageSettings,
    /// Pick the aspect ratio from the prompt when none is given.
    pub auto_aspect_ratio: bool,
}

/// Why no regular reply could be produced.
#[derive(Debug)]
enum ReplyFailure {
    /// Both image providers failed.
    Image {
        primary: GenerationError,
        fallback: OpenAiError,
    },
    /// The request was cancelled while the primary job was running.
    Abandoned(GenerationError),
    Text(OpenAiError),
}

impl ReplyFailure {
    fn kind(&self) -> &'static str {
        match self {
            Self::Image { primary, .. } => primary.kind().as_str(),
            Self::Abandoned(err) => err.kind().as_str(),
            Self::Text(_) => "text_generation",
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Image { .. } => IMAGE_UNAVAILABLE_MESSAGE.to_string(),
            Self::Abandoned(err) => err.to_string(),
            Self::Text(err) => err.to_string(),
        }
    }

    fn into_message(self, conversation_id: DbId) -> NewMessage {
        let detail = self.detail();
        let mut metadata = json!({
            "error_kind": self.kind(),
            "detail": detail,
        });
        if let Self::Image { primary, fallback } = &self {
            metadata["primary_error"] = json!(primary.to_string());
            metadata["fallback_error"] = json!(fallback.to_string());
        }
        NewMessage::text(conversation_id, ROLE_ASSISTANT, error_reply(&detail)).with_metadata(metadata)
    }
}

/// Orchestrates classifier, providers and store for one chat message.
pub struct ChatEngine {
    providers: Providers,
    classifier: Arc<dyn IntentClassifier>,
}

impl ChatEngine {
    pub fn new(providers: Providers, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            providers,
            classifier,
        }
    }

    /// Process one user message in an owned conversation.
    ///
    /// Fails only on invalid content or store errors; provider failures
    /// are persisted as the assistant reply.
    pub async fn process_message(
        &self,
        scope: OwnerScope<'_>,
        conversation_id: DbId,
        content: &str,
        options: MessageOptions,
        cancel: &CancellationToken,
    ) -> AppResult<ChatExchange> {
        validate_content(content)?;

        let user_message = scope
            .insert_message(&NewMessage::text(conversation_id, ROLE_USER, content))
            .await?;

        let intent = self.classifier.classify(content);
        tracing::info!(
            user_id = %scope.owner(),
            conversation_id,
            intent = ?intent,
            "Processing chat message",
        );

        let reply = match intent {
            Intent::Image => self.image_reply(conversation_id, content, options, cancel).await,
            Intent::Text => self.text_reply(conversation_id, content).await,
        };

        let (reply, generated) = match reply {
            Ok(ok) => ok,
            Err(failure) => {
                tracing::warn!(
                    user_id = %scope.owner(),
                    conversation_id,
                    error_kind = failure.kind(),
                    detail = %failure.detail(),
                    "Chat reply failed",
                );
                (failure.into_message(conversation_id), None)
            }
        };

        let assistant_message = scope.insert_message(&reply).await?;

        if let Some(mut image) = generated {
            image.message_id = Some(assistant_message.id);
            if let Err(e) = scope.record_generated_image(&image).await {
                tracing::warn!(
                    conversation_id,
                    message_id = assistant_message.id,
                    error = %e,
                    "Failed to record generated image",
                );
            }
        }

        Ok(ChatExchange {
            user_message,
            assistant_message,
        })
    }

    async fn image_reply(
        &self,
        conversation_id: DbId,
        content: &str,
        options: MessageOptions,
        cancel: &CancellationToken,
    ) -> Result<(NewMessage, Option<NewGeneratedImage>), ReplyFailure> {
        let mut settings = options.image_settings;
        if options.auto_aspect_ratio && settings.aspect_ratio.is_none() {
            settings.aspect_ratio = Some(suggest_aspect_ratio(content));
        }

        let primary = match GenerationRequest::new(content, settings) {
            Ok(request) => match self.providers.image.generate(&request, cancel).await {
                Ok(result) => {
                    return Ok(self.primary_message(conversation_id, content, &request, result));
                }
                Err(err) => err,
            },
            Err(e) => GenerationError::from(e),
        };

        if primary.kind() == GenerationErrorKind::Abandoned {
            return Err(ReplyFailure::Abandoned(primary));
        }

        tracing::warn!(
            conversation_id,
            error_kind = primary.kind().as_str(),
            error = %primary,
            "Primary image provider failed, trying fallback",
        );

        let fallback = &self.providers.fallback_image;
        match fallback.generate_image(content.trim()).await {
            Ok(url) => {
                let message = NewMessage {
                    conversation_id,
                    role: ROLE_ASSISTANT.to_string(),
                    content: fallback_image_reply(
                        fallback.label(),
                        self.providers.image.label(),
                        content,
                    ),
                    message_type: MESSAGE_TYPE_IMAGE.to_string(),
                    image_url: Some(url),
                    metadata: Some(json!({
                        "image_model": fallback.model_name(),
                        "aspect_ratio": settings.aspect_ratio.unwrap_or_default().as_str(),
                        "safety_filter_level":
                            settings.safety_filter_level.unwrap_or_default().as_str(),
                        "output_format": settings.output_format.unwrap_or_default().as_str(),
                        "fallback": true,
                        "primary_error_kind": primary.kind().as_str(),
                    })),
                };
                Ok((message, None))
            }
            Err(fallback_err) => {
                tracing::error!(
                    conversation_id,
                    error = %fallback_err,
                    "Fallback image provider failed",
                );
                Err(ReplyFailure::Image {
                    primary,
                    fallback: fallback_err,
                })
            }
        }
    }

    fn primary_message(
        &self,
        conversation_id: DbId,
        content: &str,
        request: &GenerationRequest,
        result: GenerationResult,
    ) -> (NewMessage, Option<NewGeneratedImage>) {
        let generation_time_ms = result.generation_time_ms();
        let metadata = &result.metadata;
        let message = NewMessage {
            conversation_id,
            role: ROLE_ASSISTANT.to_string(),
            content: primary_image_reply(self.providers.image.label(), content),
            message_type: MESSAGE_TYPE_IMAGE.to_string(),
            image_url: Some(result.image_url.clone()),
            metadata: Some(json!({
                "image_model": metadata.model_used,
                "aspect_ratio": metadata.aspect_ratio,
                "safety_filter_level": metadata.safety_filter_level,
                "output_format": metadata.output_format,
                "prediction_id": result.prediction_id,
                "generation_time_ms": generation_time_ms,
            })),
        };
        let record = NewGeneratedImage {
            conversation_id: Some(conversation_id),
            message_id: None,
            prompt: request.prompt.clone(),
            image_url: result.image_url.clone(),
            aspect_ratio: metadata.aspect_ratio.clone(),
            safety_filter_level: metadata.safety_filter_level.clone(),
            output_format: metadata.output_format.clone(),
            model_used: metadata.model_used.clone(),
            prediction_id: Some(result.prediction_id.clone()),
            generation_time_ms,
        };
        (message, Some(record))
    }

    async fn text_reply(
        &self,
        conversation_id: DbId,
        content: &str,
    ) -> Result<(NewMessage, Option<NewGeneratedImage>), ReplyFailure> {
        let reply = match self.providers.text.complete(content).await {
            Ok(reply) => reply,
            Err(e) if e.is_not_configured() => TEXT_UNCONFIGURED_REPLY.to_string(),
            Err(e) => return Err(ReplyFailure::Text(e)),
        };
        Ok((NewMessage::text(conversation_id, ROLE_ASSISTANT, reply), None))
    }
}
