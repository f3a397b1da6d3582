//! Repository for the `messages` table.

use muse_core::types::{DbId, UserId};
use sqlx::PgPool;

use crate::models::message::{Message, NewMessage};

/// Column list for `messages` queries.
const COLUMNS: &str = "\
    id, conversation_id, user_id, role, content, message_type, \
    image_url, metadata, created_at";

pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message authored in the context of `user_id`.
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        input: &NewMessage,
    ) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages \
                (conversation_id, user_id, role, content, message_type, image_url, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.conversation_id)
            .bind(user_id)
            .bind(&input.role)
            .bind(&input.content)
            .bind(&input.message_type)
            .bind(&input.image_url)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// List messages of a conversation in chronological order.
    pub async fn list_by_conversation(
        pool: &PgPool,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .fetch_all(pool)
            .await
    }

    /// Whether a message with `id` exists and belongs to `user_id`.
    pub async fn exists_owned(pool: &PgPool, id: DbId, user_id: UserId) -> Result<bool, sqlx::Error> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT id FROM messages WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.is_some())
    }
}
