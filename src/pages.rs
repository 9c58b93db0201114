use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, info};

use crate::app_state::AppState;

const INDEX_HTML: &str = include_str!("../assets/index.html");

pub async fn index() -> Html<&'static str> {
    info!("Home page accessed");
    Html(INDEX_HTML)
}

/// Raw application log for debugging. No paging or filtering.
pub async fn view_logs(State(state): State<Arc<AppState>>) -> Response {
    if !state.config.enable_log_viewer {
        return StatusCode::NOT_FOUND.into_response();
    }

    match state.log_sink.read_all().await {
        Ok(Some(logs)) => Html(format!("<pre>{}</pre>", escape_html(&logs))).into_response(),
        Ok(None) => "No logs found".into_response(),
        Err(e) => {
            error!("Failed to read logs: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error reading logs: {e}"),
            )
                .into_response()
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}
