use std::path::PathBuf;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::consts::DOWNLOAD_FILENAME;
use crate::error::{AppError, AppResult};

/// Fetches a remote video into a temporary file.
#[derive(Clone)]
pub struct VideoDownloader {
    client: reqwest::Client,
    chunk_size: usize,
    temp_dir: PathBuf,
}

/// A fully downloaded video staged on local disk.
///
/// The file is removed when this value, or the response body built from
/// it, is dropped.
#[derive(Debug)]
pub struct DownloadedVideo {
    path: TempPath,
    bytes_written: u64,
}

impl VideoDownloader {
    pub fn new(client: reqwest::Client, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size,
            temp_dir: std::env::temp_dir(),
        }
    }

    pub async fn download(&self, video_url: &str) -> AppResult<DownloadedVideo> {
        let response = self
            .client
            .get(video_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        info!(
            "Video download started, content-length: {}",
            response
                .content_length()
                .map(|len| len.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        let (file, path) = tempfile::Builder::new()
            .prefix("videogen_")
            .suffix(".mp4")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| AppError::Download(format!("Failed to create temporary file: {e}")))?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::Download(e.to_string()))?;
            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece)
                    .await
                    .map_err(|e| AppError::Download(e.to_string()))?;
                bytes_written += piece.len() as u64;
            }
        }
        file.flush()
            .await
            .map_err(|e| AppError::Download(e.to_string()))?;

        info!("Video download completed: {bytes_written} bytes written");

        Ok(DownloadedVideo {
            path,
            bytes_written,
        })
    }
}

impl DownloadedVideo {
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Serve the staged file as a `generated_video.mp4` attachment.
    pub async fn into_response(self) -> AppResult<Response> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| AppError::Download(e.to_string()))?;

        let DownloadedVideo {
            path,
            bytes_written,
        } = self;
        // body stream owns the temp path, file goes away once the body is dropped
        let stream = ReaderStream::new(file).map(move |chunk| {
            let _keep = &path;
            chunk
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "video/mp4")
            .header(header::CONTENT_LENGTH, bytes_written.to_string())
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
            )
            .body(Body::from_stream(stream))
            .map_err(|e| AppError::Download(e.to_string()))
    }
}

#[cfg(test)]
impl VideoDownloader {
    pub fn staging_in(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

#[cfg(test)]
impl DownloadedVideo {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{closed_port_url, spawn_server};
    use axum::{body::Bytes, routing::get, Router};
    use http_body_util::BodyExt;

    fn video_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_download_stages_all_bytes() {
        let payload = video_bytes(100_003);
        let served = payload.clone();
        let app = Router::new().route("/out.mp4", get(move || async move { served }));
        let base = spawn_server(app).await;

        let downloader = VideoDownloader::new(reqwest::Client::new(), 8192);
        let video = downloader.download(&format!("{base}/out.mp4")).await.unwrap();

        assert_eq!(video.bytes_written(), payload.len() as u64);
        assert_eq!(std::fs::read(video.path()).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_body_is_sent() {
        let app = Router::new().route("/out.mp4", get(|| async { vec![7u8; 4096] }));
        let base = spawn_server(app).await;

        let downloader = VideoDownloader::new(reqwest::Client::new(), 1000);
        let video = downloader.download(&format!("{base}/out.mp4")).await.unwrap();
        let path = video.path().to_path_buf();
        assert!(path.exists());

        let response = video.into_response().await.unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"generated_video.mp4\""
        );
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4096");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), 4096);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_http_error_is_fetch_error() {
        let base = spawn_server(Router::new()).await;
        let downloader = VideoDownloader::new(reqwest::Client::new(), 8192);

        let err = downloader
            .download(&format!("{base}/expired.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_network_fault_is_fetch_error() {
        let downloader = VideoDownloader::new(reqwest::Client::new(), 8192);
        let err = downloader
            .download(&format!("{}/out.mp4", closed_port_url().await))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Fetch(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_partial_file_removed_when_stream_breaks() {
        let app = Router::new().route(
            "/out.mp4",
            get(|| async {
                let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                    Ok(Bytes::from(vec![1u8; 2048])),
                    Err(std::io::Error::other("connection reset")),
                ];
                // let headers and the first chunk reach the client before the break
                Body::from_stream(futures::stream::iter(chunks).then(|chunk| async move {
                    if chunk.is_err() {
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                    chunk
                }))
            }),
        );
        let base = spawn_server(app).await;
        let staging = tempfile::tempdir().unwrap();

        let downloader =
            VideoDownloader::new(reqwest::Client::new(), 512).staging_in(staging.path());
        let err = downloader
            .download(&format!("{base}/out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Download(_)), "{err:?}");
        assert!(err.to_string().starts_with("Download failed: "));
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }
}
