use async_trait::async_trait;
use muse_core::types::{DbId, UserId};

use super::{ConversationStore, StoreError};
use crate::models::conversation::Conversation;
use crate::models::generated_image::{GeneratedImage, NewGeneratedImage};
use crate::models::message::{Message, NewMessage};
use crate::models::user_profile::{UpdateUserProfile, UserProfile};
use crate::repositories::{ConversationRepo, GeneratedImageRepo, MessageRepo, UserProfileRepo};
use crate::DbPool;

/// [`ConversationStore`] backed by the Postgres repositories.
#[derive(Clone)]
pub struct PgConversationStore {
    pool: DbPool,
}

impl PgConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn ensure_owned(&self, owner: UserId, conversation_id: DbId) -> Result<(), StoreError> {
        ConversationRepo::find_owned(&self.pool, conversation_id, owner)
            .await?
            .map(|_| ())
            .ok_or(StoreError::ConversationNotFound(conversation_id))
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_conversation(
        &self,
        owner: UserId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        Ok(ConversationRepo::create(&self.pool, owner, title).await?)
    }

    async fn list_conversations(&self, owner: UserId) -> Result<Vec<Conversation>, StoreError> {
        Ok(ConversationRepo::list_for_user(&self.pool, owner).await?)
    }

    async fn list_messages(
        &self,
        owner: UserId,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, StoreError> {
        self.ensure_owned(owner, conversation_id).await?;
        Ok(MessageRepo::list_by_conversation(&self.pool, conversation_id).await?)
    }

    async fn insert_message(
        &self,
        owner: UserId,
        input: &NewMessage,
    ) -> Result<Message, StoreError> {
        self.ensure_owned(owner, input.conversation_id).await?;
        let message = MessageRepo::create(&self.pool, owner, input).await?;
        ConversationRepo::touch(&self.pool, input.conversation_id).await?;
        Ok(message)
    }

    async fn rename_conversation(
        &self,
        owner: UserId,
        conversation_id: DbId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        ConversationRepo::update_title(&self.pool, conversation_id, owner, title)
            .await?
            .ok_or(StoreError::ConversationNotFound(conversation_id))
    }

    async fn delete_conversation(
        &self,
        owner: UserId,
        conversation_id: DbId,
    ) -> Result<(), StoreError> {
        if ConversationRepo::delete_owned(&self.pool, conversation_id, owner).await? {
            tracing::info!(conversation_id, user_id = %owner, "Conversation deleted");
            Ok(())
        } else {
            Err(StoreError::ConversationNotFound(conversation_id))
        }
    }

    async fn record_generated_image(
        &self,
        owner: UserId,
        input: &NewGeneratedImage,
    ) -> Result<GeneratedImage, StoreError> {
        if let Some(conversation_id) = input.conversation_id {
            self.ensure_owned(owner, conversation_id).await?;
        }
        if let Some(message_id) = input.message_id {
            if !MessageRepo::exists_owned(&self.pool, message_id, owner).await? {
                return Err(StoreError::MessageNotFound(message_id));
            }
        }
        Ok(GeneratedImageRepo::create(&self.pool, owner, input).await?)
    }

    async fn list_generated_images(
        &self,
        owner: UserId,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, StoreError> {
        Ok(GeneratedImageRepo::list_for_user(&self.pool, owner, limit).await?)
    }

    async fn get_or_create_profile(
        &self,
        owner: UserId,
        email: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        Ok(UserProfileRepo::get_or_create(&self.pool, owner, email).await?)
    }

    async fn update_profile(
        &self,
        owner: UserId,
        input: &UpdateUserProfile,
    ) -> Result<UserProfile, StoreError> {
        Ok(UserProfileRepo::upsert(&self.pool, owner, input).await?)
    }
}
