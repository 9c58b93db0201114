use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::types::KlingInput;
use crate::config::AppConfig;

// Prefer: wait holds the create call open for up to a minute
const CREATE_TIMEOUT: Duration = Duration::from_secs(90);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);
const PROGRESS_LOG_EVERY: u32 = 6;

#[derive(Debug, Clone, thiserror::Error)]
pub enum VideoGenError {
    #[error("Replicate rejected the API token")]
    AuthError,
    #[error("{0}")]
    NetworkError(String),
    #[error("{0}")]
    ProviderError(String),
}

/// Runs one image-to-video generation to completion and returns the raw
/// model output, before any shape normalization.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn run(&self, input: &KlingInput) -> Result<Value, VideoGenError>;
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    input: &'a KlingInput,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    output: Option<Value>,
    error: Option<Value>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    fn error_text(&self) -> String {
        match &self.error {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => format!("Prediction {}", self.status),
            Some(other) => other.to_string(),
        }
    }
}

/// Replicate predictions API client for a single model.
pub struct ReplicateClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_token: String,
    poll_interval: Duration,
    create_timeout: Duration,
}

impl ReplicateClient {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_token: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_token: api_token.into(),
            poll_interval,
            create_timeout: CREATE_TIMEOUT,
        }
    }

    pub fn from_config(client: reqwest::Client, conf: &AppConfig) -> Self {
        Self::new(
            client,
            &conf.replicate_api_url,
            &conf.replicate_model,
            &conf.replicate_api_token,
            conf.poll_interval(),
        )
    }

    async fn create_prediction(&self, input: &KlingInput) -> Result<Prediction, VideoGenError> {
        let url = format!("{}/models/{}/predictions", self.api_url, self.model);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&PredictionRequest { input })
            .timeout(self.create_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    // no prediction id yet, so nothing to cancel
                    warn!(
                        "Prediction submit timed out after {:?}, it may still run on Replicate",
                        self.create_timeout
                    );
                }
                VideoGenError::NetworkError(format!("Failed to submit prediction: {e}"))
            })?;

        parse_prediction(response).await
    }

    async fn get_prediction(&self, id: &str) -> Result<Prediction, VideoGenError> {
        let url = format!("{}/predictions/{id}", self.api_url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                VideoGenError::NetworkError(format!("Failed to check prediction status: {e}"))
            })?;

        parse_prediction(response).await
    }
}

async fn parse_prediction(response: reqwest::Response) -> Result<Prediction, VideoGenError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(VideoGenError::AuthError);
        }

        return Err(VideoGenError::ProviderError(format!(
            "Replicate API error: {status} - {error_text}"
        )));
    }

    response.json().await.map_err(|e| {
        VideoGenError::ProviderError(format!("Failed to parse prediction response: {e}"))
    })
}

#[async_trait]
impl VideoGenerator for ReplicateClient {
    async fn run(&self, input: &KlingInput) -> Result<Value, VideoGenError> {
        let mut prediction = self.create_prediction(input).await?;
        info!(
            "Replicate prediction {} created with status {}",
            prediction.id, prediction.status
        );

        let mut cancel_guard = CancelOnDrop {
            client: self.client.clone(),
            url: format!("{}/predictions/{}/cancel", self.api_url, prediction.id),
            api_token: self.api_token.clone(),
            armed: true,
        };

        let started = Instant::now();
        let mut polls: u32 = 0;
        while !prediction.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;

            polls += 1;
            if polls % PROGRESS_LOG_EVERY == 0 {
                info!(
                    "Prediction {} still {}... ({} seconds elapsed)",
                    prediction.id,
                    prediction.status,
                    started.elapsed().as_secs()
                );
            }
        }
        cancel_guard.armed = false;

        match prediction.status.as_str() {
            "succeeded" => Ok(prediction.output.unwrap_or(Value::Null)),
            _ => Err(VideoGenError::ProviderError(prediction.error_text())),
        }
    }
}

/// Cancels the remote prediction if the wait is abandoned before it finishes.
struct CancelOnDrop {
    client: reqwest::Client,
    url: String,
    api_token: String,
    armed: bool,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let client = self.client.clone();
        let url = std::mem::take(&mut self.url);
        let api_token = std::mem::take(&mut self.api_token);
        handle.spawn(async move {
            warn!("Abandoning prediction, requesting cancel: {url}");
            match client.post(&url).bearer_auth(api_token).send().await {
                Ok(res) if res.status().is_success() => info!("Prediction canceled: {url}"),
                Ok(res) => warn!("Prediction cancel returned HTTP {}: {url}", res.status()),
                Err(e) => warn!("Prediction cancel failed: {e}"),
            }
        });
    }
}
