// Replicate Constants
pub const REPLICATE_API_URL: &str = "https://api.replicate.com/v1";
pub const REPLICATE_KLING_MODEL: &str = "kwaivgi/kling-v2.1";

/// Kling generation mode sent with every prediction
pub const KLING_MODE: &str = "standard";

pub const DEFAULT_DURATION_SECS: u32 = 5;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

// Kling jobs routinely take several minutes
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 15 * 60;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024; // 16MB

pub const DEFAULT_LOG_FILE: &str = "app.log";

pub const DOWNLOAD_FILENAME: &str = "generated_video.mp4";

pub const GENERATION_SUCCESS_MESSAGE: &str = "Video generated successfully!";
