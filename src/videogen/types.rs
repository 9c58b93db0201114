use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::consts::GENERATION_SUCCESS_MESSAGE;
use crate::error::{AppError, AppResult};

/// Body of `POST /generate`.
///
/// `prompt` and `image_url` are optional at the JSON level so that a
/// missing field reaches the validator instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Seconds of video, defaults to 5
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
}

/// Input block sent to the Kling model. Field names are the model's wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlingInput {
    pub mode: String,
    pub prompt: String,
    pub duration: u32,
    pub start_image: String,
    pub negative_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerationResult {
    pub success: bool,
    pub video_url: String,
    pub message: String,
}

impl GenerationResult {
    pub fn success(video_url: String) -> Self {
        Self {
            success: true,
            video_url,
            message: GENERATION_SUCCESS_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ValidateUrlRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateUrlResponse {
    pub success: bool,
    pub image_url: String,
}

/// Every output shape the upstream model is known to return.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutput {
    /// A bare URL string
    Url(String),
    /// A file handle object carrying its URL in `url`
    Handle { url: String },
    /// A list whose first element is a URL or handle; that one is used
    List(Vec<String>),
    Unrecognized(Value),
}

impl UpstreamOutput {
    pub fn parse(raw: &Value) -> Self {
        match raw {
            Value::String(url) => UpstreamOutput::Url(url.clone()),
            Value::Object(map) => match map.get("url").and_then(Value::as_str) {
                Some(url) => UpstreamOutput::Handle {
                    url: url.to_string(),
                },
                None => UpstreamOutput::Unrecognized(raw.clone()),
            },
            Value::Array(items) => match items.first().and_then(resolve_url) {
                // the first element decides, unusable trailing entries are dropped
                Some(_) => UpstreamOutput::List(items.iter().filter_map(resolve_url).collect()),
                None => UpstreamOutput::Unrecognized(raw.clone()),
            },
            _ => UpstreamOutput::Unrecognized(raw.clone()),
        }
    }

    pub fn into_video_url(self) -> AppResult<String> {
        match self {
            UpstreamOutput::Url(url) | UpstreamOutput::Handle { url } => Ok(url),
            UpstreamOutput::List(urls) => urls.into_iter().next().ok_or_else(|| {
                AppError::Protocol("Unexpected output format: empty list".to_string())
            }),
            UpstreamOutput::Unrecognized(raw) => Err(AppError::Protocol(format!(
                "Unexpected output format: {}",
                json_kind(&raw)
            ))),
        }
    }
}

fn resolve_url(item: &Value) -> Option<String> {
    match UpstreamOutput::parse(item) {
        UpstreamOutput::Url(url) | UpstreamOutput::Handle { url } => Some(url),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(items) if items.is_empty() => "empty list",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
