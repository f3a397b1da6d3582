pub mod conversations;
pub mod generation;
pub mod health;
pub mod profile;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate-image                       generate one image (POST)
/// /generate-image/aspect-ratio          suggest an aspect ratio (GET)
/// /generated-images                     caller's image log (GET)
///
/// /conversations                        list, create
/// /conversations/{id}                   rename (PUT), delete
/// /conversations/{id}/messages          list, send
///
/// /profile                              caller's profile (GET, PUT)
/// ```
///
/// Every route requires a bearer token.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generation::router())
        .nest("/conversations", conversations::router())
        .nest("/profile", profile::router())
}
