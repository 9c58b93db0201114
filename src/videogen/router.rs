use axum::{routing::get, Router};
use std::sync::Arc;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{app_state::AppState, videogen::handlers};

/// JSON API routes for URL validation and video generation
pub fn videogen_router<S>(state: Arc<AppState>) -> OpenApiRouter<S> {
    OpenApiRouter::new()
        .routes(routes!(handlers::validate_url))
        .routes(routes!(handlers::generate_video))
        .with_state(state)
}

/// Download proxy, kept out of the OpenAPI document since the path is a wildcard URL
pub fn download_router<S>(state: Arc<AppState>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/download/{*video_url}", get(handlers::download_video))
        .with_state(state)
}
