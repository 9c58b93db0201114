use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::consts::{
    DEFAULT_BIND_ADDRESS, DEFAULT_DOWNLOAD_CHUNK_SIZE, DEFAULT_GENERATION_TIMEOUT_SECS,
    DEFAULT_LOG_FILE, DEFAULT_MAX_BODY_BYTES, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_PROBE_TIMEOUT_SECS, REPLICATE_API_URL, REPLICATE_KLING_MODEL,
};

/// Service configuration.
///
/// Read from an optional `config.toml` in the working directory, then
/// overridden by environment variables of the same name in upper case
/// (`REPLICATE_API_TOKEN`, `BIND_ADDRESS`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Replicate API token. Required, never compiled in.
    #[serde(default)]
    pub replicate_api_token: String,
    #[serde(default = "default_replicate_api_url")]
    pub replicate_api_url: String,
    /// `owner/name` of the Replicate model
    #[serde(default = "default_replicate_model")]
    pub replicate_model: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_download_chunk_size")]
    pub download_chunk_size: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_true")]
    pub enable_log_viewer: bool,
    pub sentry_dsn: Option<String>,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_replicate_api_url() -> String {
    REPLICATE_API_URL.to_string()
}

fn default_replicate_model() -> String {
    REPLICATE_KLING_MODEL.to_string()
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_generation_timeout_secs() -> u64 {
    DEFAULT_GENERATION_TIMEOUT_SECS
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_download_chunk_size() -> usize {
    DEFAULT_DOWNLOAD_CHUNK_SIZE
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config").required(false))
                .add_source(Environment::default().try_parsing(true)),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let conf: AppConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<()> {
        if self.replicate_api_token.trim().is_empty() {
            bail!("REPLICATE_API_TOKEN must be set");
        }
        if self.download_chunk_size == 0 {
            bail!("DOWNLOAD_CHUNK_SIZE must be greater than zero");
        }
        if self.poll_interval_secs == 0 {
            bail!("POLL_INTERVAL_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            replicate_api_token: "r8_test_token".to_string(),
            replicate_api_url: REPLICATE_API_URL.to_string(),
            replicate_model: REPLICATE_KLING_MODEL.to_string(),
            probe_timeout_secs: 2,
            generation_timeout_secs: 5,
            poll_interval_secs: 1,
            download_chunk_size: DEFAULT_DOWNLOAD_CHUNK_SIZE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_file: DEFAULT_LOG_FILE.to_string(),
            enable_log_viewer: true,
            sentry_dsn: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AppConfig> {
        AppConfig::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults_applied() {
        let conf = from_toml(r#"replicate_api_token = "r8_abc""#).unwrap();

        assert_eq!(conf.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(conf.replicate_model, "kwaivgi/kling-v2.1");
        assert_eq!(conf.probe_timeout(), Duration::from_secs(10));
        assert_eq!(conf.download_chunk_size, 8192);
        assert_eq!(conf.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(conf.log_file, "app.log");
        assert!(conf.enable_log_viewer);
        assert!(conf.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_token_rejected() {
        let err = from_toml(r#"bind_address = "127.0.0.1:8080""#).unwrap_err();
        assert!(err.to_string().contains("REPLICATE_API_TOKEN"));

        assert!(from_toml(r#"replicate_api_token = "   ""#).is_err());
    }

    #[test]
    fn test_overrides() {
        let conf = from_toml(
            r#"
            replicate_api_token = "r8_abc"
            probe_timeout_secs = 3
            generation_timeout_secs = 60
            enable_log_viewer = false
            log_file = "/tmp/videogen.log"
            "#,
        )
        .unwrap();

        assert_eq!(conf.probe_timeout(), Duration::from_secs(3));
        assert_eq!(conf.generation_timeout(), Duration::from_secs(60));
        assert!(!conf.enable_log_viewer);
        assert_eq!(conf.log_file, "/tmp/videogen.log");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = from_toml(
            r#"
            replicate_api_token = "r8_abc"
            download_chunk_size = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("DOWNLOAD_CHUNK_SIZE"));
    }
}
