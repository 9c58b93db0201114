use std::time::Duration;

use reqwest::StatusCode;
use tracing::{error, info, warn};

use super::validation::check_image_url_format;
use crate::error::{AppError, AppResult};

/// Confirms a user supplied image URL answers a HEAD request with 200.
#[derive(Clone)]
pub struct UrlChecker {
    client: reqwest::Client,
    timeout: Duration,
}

impl UrlChecker {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Returns the URL unchanged when it is reachable.
    pub async fn validate_url(&self, image_url: Option<&str>) -> AppResult<String> {
        info!("URL validation requested for: {}", image_url.unwrap_or_default());

        let image_url = check_image_url_format(image_url)?;

        info!("Testing URL accessibility: {image_url}");
        let response = self
            .client
            .head(image_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("URL validation error: {e} - {image_url}");
                AppError::Unreachable(format!("Cannot access image URL: {e}"))
            })?;

        if response.status() != StatusCode::OK {
            warn!(
                "URL validation failed: HTTP {} - {image_url}",
                response.status().as_u16()
            );
            return Err(AppError::Unreachable(
                "Image URL is not accessible".to_string(),
            ));
        }

        info!("URL validation successful: {image_url}");
        Ok(image_url.to_string())
    }
}
