//! Conversation entity model and DTOs.

use muse_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `conversations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: DbId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a conversation. A missing title becomes "New Chat".
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversation {
    pub title: Option<String>,
}

/// DTO for renaming a conversation.
#[derive(Debug, Deserialize)]
pub struct UpdateConversationTitle {
    pub title: String,
}
