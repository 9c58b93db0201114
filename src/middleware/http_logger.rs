use axum::{extract::Request, middleware::Next, response::Response};
use std::collections::BTreeMap;
use std::time::Instant;

/// Logs every request once it has been answered, with status and latency.
///
/// Also leaves a Sentry breadcrumb so error events carry the request trail.
pub async fn http_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let res = next.run(req).await;

    let status = res.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status >= 500 {
        tracing::error!("{method} {path} {status} ({duration_ms}ms)");
    } else if status >= 400 {
        tracing::warn!("{method} {path} {status} ({duration_ms}ms)");
    } else {
        tracing::info!("{method} {path} {status} ({duration_ms}ms)");
    }

    add_breadcrumb(method.as_str(), &path, status, duration_ms);

    res
}

fn add_breadcrumb(method: &str, path: &str, status: u16, duration_ms: u64) {
    let mut data = BTreeMap::new();
    data.insert("method".to_string(), serde_json::json!(method));
    data.insert("url".to_string(), serde_json::json!(path));
    data.insert("status_code".to_string(), serde_json::json!(status));
    data.insert("duration_ms".to_string(), serde_json::json!(duration_ms));

    let level = if status >= 500 {
        sentry::Level::Error
    } else if status >= 400 {
        sentry::Level::Warning
    } else {
        sentry::Level::Info
    };

    sentry::add_breadcrumb(sentry::Breadcrumb {
        ty: "http".to_string(),
        category: Some("http.request".to_string()),
        message: Some(format!("{method} {path} {status} ({duration_ms}ms)")),
        data: data.into_iter().collect(),
        level,
        ..Default::default()
    });
}
