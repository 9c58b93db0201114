use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Errors surfaced by the HTTP handlers.
///
/// Client-caused failures map to 400, upstream and server-side failures
/// to 500. Every variant renders as a JSON `{"error": "..."}` body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required field is missing or empty
    #[error("{0}")]
    Validation(String),

    /// A field is present but malformed
    #[error("{0}")]
    Format(String),

    /// The reachability probe failed or returned a non-OK status
    #[error("{0}")]
    Unreachable(String),

    /// The remote video could not be fetched
    #[error("Download failed: {0}")]
    Fetch(String),

    /// Writing or serving the fetched video failed
    #[error("Download failed: {0}")]
    Download(String),

    /// The upstream returned an output shape we do not understand
    #[error("Generation failed: {0}")]
    Protocol(String),

    /// The upstream generation call failed
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The request body was rejected before reaching the handler
    #[error("{}", .0.body_text())]
    Rejected(#[from] JsonRejection),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Format(_)
            | AppError::Unreachable(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(_)
            | AppError::Download(_)
            | AppError::Protocol(_)
            | AppError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Rejected(rejection) => rejection.status(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
