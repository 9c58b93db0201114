use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    response::Response,
    Json,
};
use tracing::{error, info};

use super::types::{GenerationRequest, GenerationResult, ValidateUrlRequest, ValidateUrlResponse};
use crate::app_state::AppState;
use crate::error::{AppResult, ErrorBody};

/// Check that an image URL is well formed and reachable
#[utoipa::path(
    post,
    path = "/validate_url",
    request_body = ValidateUrlRequest,
    responses(
        (status = 200, description = "URL is reachable", body = ValidateUrlResponse),
        (status = 400, description = "URL missing, malformed or unreachable", body = ErrorBody),
    ),
    tag = "VideoGen"
)]
pub async fn validate_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ValidateUrlRequest>, JsonRejection>,
) -> AppResult<Json<ValidateUrlResponse>> {
    let Json(request) = payload?;

    let image_url = state
        .url_checker
        .validate_url(request.image_url.as_deref())
        .await?;

    Ok(Json(ValidateUrlResponse {
        success: true,
        image_url,
    }))
}

/// Generate a video from an image and a prompt, waiting for the result
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Video generated", body = GenerationResult),
        (status = 400, description = "Prompt or image URL missing", body = ErrorBody),
        (status = 500, description = "Upstream generation failed", body = ErrorBody),
    ),
    tag = "VideoGen"
)]
pub async fn generate_video(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> AppResult<Json<GenerationResult>> {
    let Json(request) = payload?;

    info!(
        "Video generation request started - Prompt: '{}...', Image: {}, Duration: {}s",
        truncate_chars(request.prompt.as_deref().unwrap_or_default(), 50),
        request.image_url.as_deref().unwrap_or_default(),
        request
            .duration
            .unwrap_or(crate::consts::DEFAULT_DURATION_SECS)
    );

    state
        .gateway
        .generate(request)
        .await
        .map(Json)
        .inspect_err(|e| {
            if e.status_code().is_server_error() {
                error!("Video generation failed: {e}");
            }
        })
}

/// Proxy a generated video back to the caller as a file download.
///
/// The remote URL is the rest of the path, with any query string kept.
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    Path(video_url): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let video_url = match query {
        Some(query) => format!("{video_url}?{query}"),
        None => video_url,
    };
    info!("Video download requested: {video_url}");

    let result = match state.downloader.download(&video_url).await {
        Ok(video) => {
            info!("Serving downloaded video: {} bytes", video.bytes_written());
            video.into_response().await
        }
        Err(e) => Err(e),
    };

    result.inspect_err(|e| error!("Video download failed: {e} - {video_url}"))
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    s.char_indices()
        .nth(max_chars)
        .map(|(idx, _)| &s[..idx])
        .unwrap_or(s)
}
