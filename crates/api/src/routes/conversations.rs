use axum::routing::{get, put};
use axum::Router;

use crate::handlers::conversations;
use crate::state::AppState;

/// Conversation routes mounted at `/conversations`.
///
/// ```text
/// GET    /                  -> list_conversations
/// POST   /                  -> create_conversation
/// PUT    /{id}              -> rename_conversation
/// DELETE /{id}              -> delete_conversation
/// GET    /{id}/messages     -> list_messages
/// POST   /{id}/messages     -> send_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/{id}",
            put(conversations::rename_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/{id}/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
}
