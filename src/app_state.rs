use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client as ReqwestClient;

use crate::config::AppConfig;
use crate::logging::LogSink;
use crate::videogen::download::VideoDownloader;
use crate::videogen::gateway::GenerationGateway;
use crate::videogen::reachability::UrlChecker;
use crate::videogen::replicate::{ReplicateClient, VideoGenerator};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub url_checker: UrlChecker,
    pub gateway: GenerationGateway,
    pub downloader: VideoDownloader,
    pub log_sink: LogSink,
}

impl AppState {
    pub fn new(app_config: AppConfig, log_sink: LogSink) -> Result<Self> {
        let client = ReqwestClient::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let replicate = ReplicateClient::from_config(client.clone(), &app_config);

        Ok(Self::with_generator(
            app_config,
            log_sink,
            client,
            Arc::new(replicate),
        ))
    }

    /// Assemble the state around any generator, shared HTTP client for the rest.
    pub fn with_generator(
        app_config: AppConfig,
        log_sink: LogSink,
        client: ReqwestClient,
        generator: Arc<dyn VideoGenerator>,
    ) -> Self {
        Self {
            url_checker: UrlChecker::new(client.clone(), app_config.probe_timeout()),
            gateway: GenerationGateway::new(generator, app_config.generation_timeout()),
            downloader: VideoDownloader::new(client, app_config.download_chunk_size),
            log_sink,
            config: app_config,
        }
    }
}
