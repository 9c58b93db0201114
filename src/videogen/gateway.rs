use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::replicate::VideoGenerator;
use super::types::{GenerationRequest, GenerationResult, UpstreamOutput};
use super::validation::into_kling_input;
use crate::error::{AppError, AppResult};

/// Validates a generation request, runs it upstream with a deadline and
/// normalizes whatever the model returned into a single video URL.
#[derive(Clone)]
pub struct GenerationGateway {
    generator: Arc<dyn VideoGenerator>,
    timeout: Duration,
}

impl GenerationGateway {
    pub fn new(generator: Arc<dyn VideoGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn generate(&self, request: GenerationRequest) -> AppResult<GenerationResult> {
        let input = into_kling_input(request)?;

        info!(
            "Calling Replicate API with parameters: {}",
            serde_json::to_string(&input).unwrap_or_else(|_| format!("{input:?}"))
        );

        let started = Instant::now();
        info!("Starting Replicate API call - waiting for the prediction to complete...");

        let output = match tokio::time::timeout(self.timeout, self.generator.run(&input)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(
                    "Replicate API call failed after {:.2} seconds: {e}",
                    started.elapsed().as_secs_f64()
                );
                return Err(AppError::Generation(e.to_string()));
            }
            Err(_) => {
                error!(
                    "Replicate API call timed out after {} seconds",
                    self.timeout.as_secs()
                );
                return Err(AppError::Generation(format!(
                    "Video generation timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        info!(
            "Replicate API call completed in {:.2} seconds",
            started.elapsed().as_secs_f64()
        );
        info!("Video output: {output}");

        let video_url = UpstreamOutput::parse(&output)
            .into_video_url()
            .inspect_err(|e| error!("{e} - raw output: {output}"))?;

        info!("Video generated successfully: {video_url}");
        Ok(GenerationResult::success(video_url))
    }
}
