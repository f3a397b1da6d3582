//! Owner-scoped conversation store.
//!
//! Every operation takes the requesting identity and enforces ownership
//! itself, so call sites never repeat the "fetch identity, then filter by
//! owner" dance. A conversation owned by someone else is reported exactly
//! like a missing one ([`StoreError::ConversationNotFound`]).
//!
//! Handlers usually bind the identity once through [`OwnerScope`].

mod memory;
mod postgres;

use async_trait::async_trait;
use muse_core::error::CoreError;
use muse_core::types::{DbId, UserId};

use crate::models::conversation::Conversation;
use crate::models::generated_image::{GeneratedImage, NewGeneratedImage};
use crate::models::message::{Message, NewMessage};
use crate::models::user_profile::{UpdateUserProfile, UserProfile};

pub use memory::MemoryConversationStore;
pub use postgres::PgConversationStore;

/// Errors from a [`ConversationStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The conversation does not exist or is not owned by the caller.
    #[error("Conversation {0} not found")]
    ConversationNotFound(DbId),

    /// The message does not exist or is not owned by the caller.
    #[error("Message {0} not found")]
    MessageNotFound(DbId),

    /// The input was rejected before reaching storage.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence of conversations, messages, the generated-image log and
/// user profiles.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn create_conversation(
        &self,
        owner: UserId,
        title: &str,
    ) -> Result<Conversation, StoreError>;

    /// Conversations of `owner`, most recently updated first.
    async fn list_conversations(&self, owner: UserId) -> Result<Vec<Conversation>, StoreError>;

    /// Messages of an owned conversation, oldest first.
    async fn list_messages(
        &self,
        owner: UserId,
        conversation_id: DbId,
    ) -> Result<Vec<Message>, StoreError>;

    /// Append a message to an owned conversation and bump its `updated_at`.
    async fn insert_message(&self, owner: UserId, input: &NewMessage)
        -> Result<Message, StoreError>;

    async fn rename_conversation(
        &self,
        owner: UserId,
        conversation_id: DbId,
        title: &str,
    ) -> Result<Conversation, StoreError>;

    /// Delete an owned conversation together with its messages.
    async fn delete_conversation(&self, owner: UserId, conversation_id: DbId)
        -> Result<(), StoreError>;

    /// Log a generated image. Referenced conversation/message must be owned.
    async fn record_generated_image(
        &self,
        owner: UserId,
        input: &NewGeneratedImage,
    ) -> Result<GeneratedImage, StoreError>;

    /// Generated images of `owner`, newest first.
    async fn list_generated_images(
        &self,
        owner: UserId,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, StoreError>;

    /// The profile of `owner`; the first read creates it with `email`.
    async fn get_or_create_profile(
        &self,
        owner: UserId,
        email: Option<&str>,
    ) -> Result<UserProfile, StoreError>;

    /// Overwrite the fields present in `input`, creating the profile if needed.
    async fn update_profile(
        &self,
        owner: UserId,
        input: &UpdateUserProfile,
    ) -> Result<UserProfile, StoreError>;
}

// ---------------------------------------------------------------------------
// OwnerScope
// ---------------------------------------------------------------------------

/// A [`ConversationStore`] bound to one identity.
#[derive(Clone, Copy)]
pub struct OwnerScope<'a> {
    store: &'a dyn ConversationStore,
    owner: UserId,
}

impl<'a> OwnerScope<'a> {
    pub fn new(store: &'a dyn ConversationStore, owner: UserId) -> Self {
        Self { store, owner }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub async fn create_conversation(&self, title: &str) -> Result<Conversation, StoreError> {
        self.store.create_conversation(self.owner, title).await
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.store.list_conversations(self.owner).await
    }

    pub async fn list_messages(&self, conversation_id: DbId) -> Result<Vec<Message>, StoreError> {
        self.store.list_messages(self.owner, conversation_id).await
    }

    pub async fn insert_message(&self, input: &NewMessage) -> Result<Message, StoreError> {
        input.validate()?;
        self.store.insert_message(self.owner, input).await
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: DbId,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        self.store
            .rename_conversation(self.owner, conversation_id, title)
            .await
    }

    pub async fn delete_conversation(&self, conversation_id: DbId) -> Result<(), StoreError> {
        self.store.delete_conversation(self.owner, conversation_id).await
    }

    pub async fn record_generated_image(
        &self,
        input: &NewGeneratedImage,
    ) -> Result<GeneratedImage, StoreError> {
        self.store.record_generated_image(self.owner, input).await
    }

    pub async fn list_generated_images(&self, limit: i64) -> Result<Vec<GeneratedImage>, StoreError> {
        self.store.list_generated_images(self.owner, limit).await
    }

    pub async fn get_or_create_profile(
        &self,
        email: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        self.store.get_or_create_profile(self.owner, email).await
    }

    pub async fn update_profile(
        &self,
        input: &UpdateUserProfile,
    ) -> Result<UserProfile, StoreError> {
        self.store.update_profile(self.owner, input).await
    }
}
