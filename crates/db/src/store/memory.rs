use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use muse_core::types::{DbId, Timestamp, UserId};
use tokio::sync::RwLock;

use super::{ConversationStore, StoreError};
use crate::models::conversation::Conversation;
use crate::models::generated_image::{GeneratedImage, NewGeneratedImage};
use crate::models::message::{Message, NewMessage};
use crate::models::user_profile::{UpdateUserProfile, UserProfile};

/// [`ConversationStore`] kept in process memory.
///
/// Used when no `DATABASE_URL` is configured and by the test suites. It
/// mirrors the Postgres semantics: owner filtering, recency ordering,
/// cascade on delete and `SET NULL` on the generated-image log.
#[derive(Default)]
pub struct MemoryConversationStore {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    last_timestamp: Option<Timestamp>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    images: Vec<GeneratedImage>,
    profiles: HashMap<UserId, UserProfile>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps keep orderings deterministic.
    fn now(&mut self) -> Timestamp {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn profile_mut(
        &mut self,
        owner: UserId,
        email: Option<&str>,
        now: Timestamp,
    ) -> &mut UserProfile {
        self.profiles.entry(owner).or_insert_with(|| UserProfile {
            id: owner,
            email: email.map(str::to_string),
            username: None,
            full_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn owned_mut(&mut self, owner: UserId, id: DbId) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id && c.user_id == owner)
            .ok_or(StoreError::ConversationNotFound(id))
    }

    fn ensure_owned(&self, owner: UserId, id: DbId) -> Result<(), StoreError> {
        if self
            .conversations
            .iter()
            .any(|c| c.id == id && c.user_id == owner)
        {
            Ok(())
        } else {
            Err(StoreError::ConversationNotFound(id))
        }
    }
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_conversation(
        &self,
        owner: UserId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let mut state = self.inner.write().await;
        let now = state.now();
        let conversation = Conversation {
            id: state.next_id(),
            user_id: owner,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, owner: UserId) -> Result<Vec<Conversation>, StoreError> {
        let state = self.inner.read().await;
        let mut list: Vec<Conversation> = state
            .conversations
            .iter()
            .filter(|c| c.user_id == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn list_messages(
        &self,
        owner: UserId,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, StoreError> {
        let state = self.inner.read().await;
        state.ensure_owned(owner, conversation_id)?;
        let mut list: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn insert_message(
        &self,
        owner: UserId,
        input: &NewMessage,
    ) -> Result<Message, StoreError> {
        let mut state = self.inner.write().await;
        state.ensure_owned(owner, input.conversation_id)?;
        let now = state.now();
        let message = Message {
            id: state.next_id(),
            conversation_id: input.conversation_id,
            user_id: owner,
            role: input.role.clone(),
            content: input.content.clone(),
            message_type: input.message_type.clone(),
            image_url: input.image_url.clone(),
            metadata: input.metadata.clone(),
            created_at: now,
        };
        state.messages.push(message.clone());
        state.owned_mut(owner, input.conversation_id)?.updated_at = now;
        Ok(message)
    }

    async fn rename_conversation(
        &self,
        owner: UserId,
        conversation_id: DbId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let mut state = self.inner.write().await;
        let now = state.now();
        let conversation = state.owned_mut(owner, conversation_id)?;
        conversation.title = title.to_string();
        conversation.updated_at = now;
        Ok(conversation.clone())
    }

    async fn delete_conversation(
        &self,
        owner: UserId,
        conversation_id: DbId,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        state.ensure_owned(owner, conversation_id)?;

        let removed_messages: Vec<DbId> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .map(|m| m.id)
            .collect();

        state.conversations.retain(|c| c.id != conversation_id);
        state.messages.retain(|m| m.conversation_id != conversation_id);
        for image in state.images.iter_mut() {
            if image.conversation_id == Some(conversation_id) {
                image.conversation_id = None;
            }
            if image
                .message_id
                .is_some_and(|id| removed_messages.contains(&id))
            {
                image.message_id = None;
            }
        }
        Ok(())
    }

    async fn record_generated_image(
        &self,
        owner: UserId,
        input: &NewGeneratedImage,
    ) -> Result<GeneratedImage, StoreError> {
        let mut state = self.inner.write().await;
        if let Some(conversation_id) = input.conversation_id {
            state.ensure_owned(owner, conversation_id)?;
        }
        if let Some(message_id) = input.message_id {
            if !state
                .messages
                .iter()
                .any(|m| m.id == message_id && m.user_id == owner)
            {
                return Err(StoreError::MessageNotFound(message_id));
            }
        }

        let now = state.now();
        let image = GeneratedImage {
            id: state.next_id(),
            user_id: owner,
            conversation_id: input.conversation_id,
            message_id: input.message_id,
            prompt: input.prompt.clone(),
            image_url: input.image_url.clone(),
            aspect_ratio: input.aspect_ratio.clone(),
            safety_filter_level: input.safety_filter_level.clone(),
            output_format: input.output_format.clone(),
            model_used: input.model_used.clone(),
            prediction_id: input.prediction_id.clone(),
            generation_time_ms: input.generation_time_ms,
            created_at: now,
        };
        state.images.push(image.clone());
        Ok(image)
    }

    async fn list_generated_images(
        &self,
        owner: UserId,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, StoreError> {
        let state = self.inner.read().await;
        let mut list: Vec<GeneratedImage> = state
            .images
            .iter()
            .filter(|i| i.user_id == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(list)
    }

    async fn get_or_create_profile(
        &self,
        owner: UserId,
        email: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        let mut state = self.inner.write().await;
        let now = state.now();
        Ok(state.profile_mut(owner, email, now).clone())
    }

    async fn update_profile(
        &self,
        owner: UserId,
        input: &UpdateUserProfile,
    ) -> Result<UserProfile, StoreError> {
        let mut state = self.inner.write().await;
        let now = state.now();
        let profile = state.profile_mut(owner, None, now);
        if let Some(username) = &input.username {
            profile.username = Some(username.clone());
        }
        if let Some(full_name) = &input.full_name {
            profile.full_name = Some(full_name.clone());
        }
        if let Some(avatar_url) = &input.avatar_url {
            profile.avatar_url = Some(avatar_url.clone());
        }
        profile.updated_at = now;
        Ok(profile.clone())
    }
}
