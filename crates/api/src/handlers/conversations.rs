//! Handlers for conversations and their messages.
//!
//! Every handler goes through an [`OwnerScope`]; a conversation owned by
//! another user answers 404 exactly like a missing one.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use muse_core::chat::{validate_title, DEFAULT_CONVERSATION_TITLE};
use muse_core::image_request::ImageSettings;
use muse_core::types::DbId;
use muse_db::models::conversation::{CreateConversation, UpdateConversationTitle};
use muse_db::store::OwnerScope;
use serde::Deserialize;

use crate::engine::chat::MessageOptions;
use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/conversations/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_settings: Option<ImageSettings>,
    #[serde(default)]
    pub auto_aspect_ratio: bool,
}

/// GET /api/conversations
pub async fn list_conversations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let conversations = scope.list_conversations().await?;

    Ok(Json(DataResponse {
        data: conversations,
    }))
}

/// POST /api/conversations
pub async fn create_conversation(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateConversation>,
) -> AppResult<impl IntoResponse> {
    let title = match input.title.as_deref() {
        Some(raw) => validate_title(raw)?,
        None => DEFAULT_CONVERSATION_TITLE.to_string(),
    };

    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let conversation = scope.create_conversation(&title).await?;

    tracing::info!(
        conversation_id = conversation.id,
        user_id = %auth.user_id,
        "Conversation created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: conversation })))
}

/// PUT /api/conversations/{id}
pub async fn rename_conversation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    ApiJson(input): ApiJson<UpdateConversationTitle>,
) -> AppResult<impl IntoResponse> {
    let title = validate_title(&input.title)?;

    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let conversation = scope.rename_conversation(conversation_id, &title).await?;

    Ok(Json(DataResponse { data: conversation }))
}

/// DELETE /api/conversations/{id}
///
/// Deletes the conversation and all of its messages.
pub async fn delete_conversation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    scope.delete_conversation(conversation_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/conversations/{id}/messages
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let messages = scope.list_messages(conversation_id).await?;

    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/conversations/{id}/messages
///
/// Saves the user's message and answers with the persisted exchange.
/// Provider failures still answer 201; the assistant message then
/// describes the error.
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    ApiJson(body): ApiJson<SendMessageBody>,
) -> AppResult<impl IntoResponse> {
    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let options = MessageOptions {
        image_settings: body.image_settings.unwrap_or_default(),
        auto_aspect_ratio: body.auto_aspect_ratio,
    };

    let content = body.content.as_deref().unwrap_or_default();

    let (cancel, _guard) = state.request_cancellation();
    let exchange = state
        .chat
        .process_message(scope, conversation_id, content, options, &cancel)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: exchange })))
}
