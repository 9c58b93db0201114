use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::logging::LogSink;
use crate::videogen::replicate::{VideoGenError, VideoGenerator};
use crate::videogen::types::KlingInput;

/// Serve `router` on an ephemeral local port, returns `http://127.0.0.1:<port>`.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a local port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Generator returning a canned result and recording what it was asked.
pub struct FakeGenerator {
    result: Result<Value, String>,
    pub calls: AtomicUsize,
    pub last_input: std::sync::Mutex<Option<KlingInput>>,
}

impl FakeGenerator {
    pub fn returning(output: Value) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(output),
            calls: AtomicUsize::new(0),
            last_input: std::sync::Mutex::new(None),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_input: std::sync::Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoGenerator for FakeGenerator {
    async fn run(&self, input: &KlingInput) -> Result<Value, VideoGenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());
        self.result
            .clone()
            .map_err(VideoGenError::ProviderError)
    }
}

pub fn test_state(generator: Arc<dyn VideoGenerator>, log_sink: LogSink) -> Arc<AppState> {
    Arc::new(AppState::with_generator(
        AppConfig::for_tests(),
        log_sink,
        reqwest::Client::new(),
        generator,
    ))
}
