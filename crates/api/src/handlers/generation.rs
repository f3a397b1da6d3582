//! Handlers for direct image generation and the generated-image log.

use axum::extract::{Query, State};
use axum::Json;
use muse_core::image_request::{
    suggest_aspect_ratio, AspectRatio, GenerationRequest, ImageSettings, OutputFormat,
    SafetyFilterLevel,
};
use muse_core::types::DbId;
use muse_db::models::generated_image::{GeneratedImage, GeneratedImageListParams, NewGeneratedImage};
use muse_db::store::OwnerScope;
use muse_providers::bridge::{GenerationError, ImageMetadata};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size of the generated-image log.
const DEFAULT_LIST_LIMIT: i64 = 50;
/// Maximum page size of the generated-image log.
const MAX_LIST_LIMIT: i64 = 200;

/// Body of `POST /api/generate-image`.
#[derive(Debug, Deserialize)]
pub struct GenerateImageBody {
    /// Absent and `null` both read as an empty prompt.
    #[serde(default)]
    pub prompt: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
    pub safety_filter_level: Option<SafetyFilterLevel>,
    pub output_format: Option<OutputFormat>,
    /// Conversation the image belongs to, for the image log.
    pub conversation_id: Option<DbId>,
    pub message_id: Option<DbId>,
}

impl GenerateImageBody {
    fn settings(&self) -> ImageSettings {
        ImageSettings {
            aspect_ratio: self.aspect_ratio,
            safety_filter_level: self.safety_filter_level,
            output_format: self.output_format,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub success: bool,
    pub image_url: String,
    pub generation_time_ms: i64,
    pub prediction_id: String,
    pub metadata: ImageMetadata,
}

/// POST /api/generate-image
///
/// Submit one job to the primary image service and wait for its result.
pub async fn generate_image(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GenerateImageBody>,
) -> AppResult<Json<GenerateImageResponse>> {
    let prompt = body.prompt.as_deref().unwrap_or_default();
    let request = GenerationRequest::new(prompt, body.settings())
        .map_err(GenerationError::from)?;

    let (cancel, _guard) = state.request_cancellation();
    let result = state.providers.image.generate(&request, &cancel).await?;
    let generation_time_ms = result.generation_time_ms();

    tracing::info!(
        user_id = %auth.user_id,
        prediction_id = %result.prediction_id,
        attempts = result.attempts,
        generation_time_ms,
        "Image generated",
    );

    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let record = NewGeneratedImage {
        conversation_id: body.conversation_id,
        message_id: body.message_id,
        prompt: request.prompt.clone(),
        image_url: result.image_url.clone(),
        aspect_ratio: result.metadata.aspect_ratio.clone(),
        safety_filter_level: result.metadata.safety_filter_level.clone(),
        output_format: result.metadata.output_format.clone(),
        model_used: result.metadata.model_used.clone(),
        prediction_id: Some(result.prediction_id.clone()),
        generation_time_ms,
    };
    if let Err(e) = scope.record_generated_image(&record).await {
        tracing::warn!(
            user_id = %auth.user_id,
            prediction_id = %result.prediction_id,
            error = %e,
            "Failed to record generated image",
        );
    }

    Ok(Json(GenerateImageResponse {
        success: true,
        image_url: result.image_url,
        generation_time_ms,
        prediction_id: result.prediction_id,
        metadata: result.metadata,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AspectRatioQuery {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AspectRatioSuggestion {
    pub aspect_ratio: AspectRatio,
}

/// GET /api/generate-image/aspect-ratio?prompt=
pub async fn suggest_ratio(
    _auth: AuthUser,
    Query(query): Query<AspectRatioQuery>,
) -> Json<AspectRatioSuggestion> {
    Json(AspectRatioSuggestion {
        aspect_ratio: suggest_aspect_ratio(&query.prompt),
    })
}

/// GET /api/generated-images?limit=
///
/// The caller's generated images, newest first.
pub async fn list_generated_images(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<GeneratedImageListParams>,
) -> AppResult<Json<DataResponse<Vec<GeneratedImage>>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let images = scope.list_generated_images(limit).await?;

    Ok(Json(DataResponse { data: images }))
}
