//! Repository for the `conversations` table.

use muse_core::types::{DbId, UserId};
use sqlx::PgPool;

use crate::models::conversation::Conversation;

/// Column list for `conversations` queries.
const COLUMNS: &str = "id, user_id, title, created_at, updated_at";

/// Provides owner-filtered CRUD operations for conversations.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Create a new conversation owned by `user_id`, returning the full row.
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        title: &str,
    ) -> Result<Conversation, sqlx::Error> {
        let query = format!(
            "INSERT INTO conversations (user_id, title) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(user_id)
            .bind(title)
            .fetch_one(pool)
            .await
    }

    /// List a user's conversations, most recently updated first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM conversations WHERE user_id = $1 \
             ORDER BY updated_at DESC, id DESC"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Find a conversation by ID, only if it belongs to `user_id`.
    pub async fn find_owned(
        pool: &PgPool,
        id: DbId,
        user_id: UserId,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM conversations WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Rename a conversation owned by `user_id`. Returns `None` if no such row.
    pub async fn update_title(
        pool: &PgPool,
        id: DbId,
        user_id: UserId,
        title: &str,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!(
            "UPDATE conversations SET title = $1, updated_at = NOW() \
             WHERE id = $2 AND user_id = $3 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(title)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a conversation owned by `user_id`; messages cascade.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete_owned(pool: &PgPool, id: DbId, user_id: UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bump `updated_at` so the conversation sorts first in recency lists.
    pub async fn touch(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
