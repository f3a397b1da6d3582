//! Handlers for the caller's user profile.

use axum::extract::State;
use axum::Json;
use muse_core::profile::{validate_avatar_url, validate_full_name, validate_username};
use muse_db::models::user_profile::{UpdateUserProfile, UserProfile};
use muse_db::store::OwnerScope;

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/profile
///
/// Creates an empty profile, seeded with the token's email, on first read.
pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    let profile = scope.get_or_create_profile(auth.email.as_deref()).await?;

    Ok(Json(DataResponse { data: profile }))
}

/// PUT /api/profile
///
/// Partial update: fields left out of the body keep their value.
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UpdateUserProfile>,
) -> AppResult<Json<DataResponse<UserProfile>>> {
    let update = UpdateUserProfile {
        username: input.username.as_deref().map(validate_username).transpose()?,
        full_name: input.full_name.as_deref().map(validate_full_name).transpose()?,
        avatar_url: input.avatar_url.as_deref().map(validate_avatar_url).transpose()?,
    };

    let scope = OwnerScope::new(state.store.as_ref(), auth.user_id);
    scope.get_or_create_profile(auth.email.as_deref()).await?;
    let profile = scope.update_profile(&update).await?;

    tracing::info!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(DataResponse { data: profile }))
}
