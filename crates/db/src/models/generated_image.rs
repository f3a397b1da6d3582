//! Generated image log entity model and DTOs.

use muse_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `generated_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedImage {
    pub id: DbId,
    pub user_id: UserId,
    pub conversation_id: Option<DbId>,
    pub message_id: Option<DbId>,
    pub prompt: String,
    pub image_url: String,
    pub aspect_ratio: String,
    pub safety_filter_level: String,
    pub output_format: String,
    pub model_used: String,
    pub prediction_id: Option<String>,
    pub generation_time_ms: i64,
    pub created_at: Timestamp,
}

/// Input for recording a generated image.
#[derive(Debug, Clone)]
pub struct NewGeneratedImage {
    pub conversation_id: Option<DbId>,
    pub message_id: Option<DbId>,
    pub prompt: String,
    pub image_url: String,
    pub aspect_ratio: String,
    pub safety_filter_level: String,
    pub output_format: String,
    pub model_used: String,
    pub prediction_id: Option<String>,
    pub generation_time_ms: i64,
}

/// Query parameters for listing generated images.
#[derive(Debug, Deserialize)]
pub struct GeneratedImageListParams {
    pub limit: Option<i64>,
}
