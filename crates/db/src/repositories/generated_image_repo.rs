//! Repository for the `generated_images` table.

use muse_core::types::UserId;
use sqlx::PgPool;

use crate::models::generated_image::{GeneratedImage, NewGeneratedImage};

/// Column list for `generated_images` queries.
const COLUMNS: &str = "\
    id, user_id, conversation_id, message_id, prompt, image_url, \
    aspect_ratio, safety_filter_level, output_format, model_used, \
    prediction_id, generation_time_ms, created_at";

pub struct GeneratedImageRepo;

impl GeneratedImageRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        input: &NewGeneratedImage,
    ) -> Result<GeneratedImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_images \
                (user_id, conversation_id, message_id, prompt, image_url, aspect_ratio, \
                 safety_filter_level, output_format, model_used, prediction_id, generation_time_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(user_id)
            .bind(input.conversation_id)
            .bind(input.message_id)
            .bind(&input.prompt)
            .bind(&input.image_url)
            .bind(&input.aspect_ratio)
            .bind(&input.safety_filter_level)
            .bind(&input.output_format)
            .bind(&input.model_used)
            .bind(&input.prediction_id)
            .bind(input.generation_time_ms)
            .fetch_one(pool)
            .await
    }

    /// List a user's generated images, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_images WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
