use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::instrument;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

mod app_state;
mod config;
mod consts;
mod error;
mod logging;
mod middleware;
mod pages;
#[cfg(test)]
mod test_utils;
pub mod videogen;

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::logging::LogSink;

/// Full HTTP surface: pages, JSON API, download proxy and docs.
fn app_router(shared_state: Arc<AppState>) -> Router {
    #[derive(OpenApi)]
    #[openapi(
        tags(
            (name = "VideoGen", description = "Image-to-video generation API"),
        )
    )]
    struct ApiDoc;

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(videogen::videogen_router(shared_state.clone()))
        .split_for_parts();

    let router =
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()));

    let sentry_tower_layer = ServiceBuilder::new()
        .layer(NewSentryLayer::new_from_top())
        .layer(SentryHttpLayer::with_transaction());

    Router::new()
        .route("/", get(pages::index))
        .route("/logs", get(pages::view_logs))
        .route("/healthz", get(health_handler))
        .merge(videogen::download_router(shared_state.clone()))
        .fallback_service(router)
        .layer(DefaultBodyLimit::max(shared_state.config.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            crate::middleware::http_logging_middleware,
        )) // HTTP logging before Sentry
        .layer(sentry_tower_layer)
        .with_state(shared_state)
}

async fn main_impl(conf: AppConfig, log_sink: LogSink) -> Result<()> {
    tracing::info!(
        "Starting AI Video Generator application, logging to {}",
        log_sink.path().display()
    );

    let shared_state = Arc::new(AppState::new(conf.clone(), log_sink)?);
    tracing::info!(
        "Application configured with Replicate model {}",
        conf.replicate_model
    );

    let listener = tokio::net::TcpListener::bind(&conf.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", conf.bind_address))?;

    log::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app_router(shared_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn main() -> Result<()> {
    let conf = AppConfig::load()?;

    let dsn = conf
        .sentry_dsn
        .as_deref()
        .filter(|dsn| !dsn.is_empty())
        .map(str::parse::<sentry::types::Dsn>)
        .transpose()
        .context("Invalid SENTRY_DSN")?;

    // without a DSN the client is disabled and nothing is sent
    let _guard = sentry::init(sentry::ClientOptions {
        dsn,
        release: sentry::release_name!(),
        traces_sample_rate: std::env::var("SENTRY_TRACES_SAMPLE_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5),
        attach_stacktrace: true,
        ..Default::default()
    });

    let log_sink = LogSink::install(&conf)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(main_impl(conf, log_sink))
}

#[instrument]
async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
