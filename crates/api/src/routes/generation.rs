use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Image generation routes, merged at the `/api` root.
///
/// ```text
/// POST   /generate-image                 -> generate_image
/// GET    /generate-image/aspect-ratio    -> suggest_ratio
/// GET    /generated-images               -> list_generated_images
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-image", post(generation::generate_image))
        .route(
            "/generate-image/aspect-ratio",
            get(generation::suggest_ratio),
        )
        .route(
            "/generated-images",
            get(generation::list_generated_images),
        )
}
