//! Chat message entity model and DTOs.

use muse_core::chat::{validate_message_type, validate_role};
use muse_core::error::CoreError;
use muse_core::types::{DbId, Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub user_id: UserId,
    pub role: String,
    pub content: String,
    pub message_type: String,
    pub image_url: Option<String>,
    /// Image settings for image replies, `error_kind` for failed replies.
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

/// Input for inserting a message. The owning user comes from the store scope.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: DbId,
    pub role: String,
    pub content: String,
    pub message_type: String,
    pub image_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewMessage {
    /// A plain text message.
    pub fn text(conversation_id: DbId, role: &str, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            role: role.to_string(),
            content: content.into(),
            message_type: muse_core::chat::MESSAGE_TYPE_TEXT.to_string(),
            image_url: None,
            metadata: None,
        }
    }

    /// Check the role and message type against the allowed vocabularies.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_role(&self.role)?;
        validate_message_type(&self.message_type)
    }

    /// Attach a metadata object.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
