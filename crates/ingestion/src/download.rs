//! Grid file downloads with retry.
//!
//! Files are streamed to `<name>.partial` and renamed into place only once the
//! body has been fully written, so a raw grid file on disk is always complete.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};

/// Fetches one raw grid file to a local path.
#[async_trait]
pub trait GridFetcher: Send + Sync {
    /// Download `url` to `dest`, returning the path written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf>;
}

/// Configuration for the downloader.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Retries after the first attempt, for transport errors and 5xx only
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600), // 10 minutes
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Why a single attempt failed, and whether another attempt may help.
struct AttemptError {
    reason: String,
    retryable: bool,
}

pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
}

impl HttpDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| IngestionError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn attempt(&self, url: &str, partial: &Path) -> std::result::Result<u64, AttemptError> {
        let response = self.client.get(url).send().await.map_err(|e| AttemptError {
            reason: format!("HTTP request failed: {}", e),
            retryable: true,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError {
                reason: format!("HTTP error: {}", status),
                retryable: status.is_server_error(),
            });
        }

        let expected = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let written = stream_to_file(response, partial).await?;

        if let Some(expected) = expected {
            if written != expected {
                return Err(AttemptError {
                    reason: format!(
                        "Download size mismatch: expected {} bytes, got {}",
                        expected, written
                    ),
                    retryable: true,
                });
            }
        }

        Ok(written)
    }
}

/// Stream the response body to `path`, truncating any previous content.
async fn stream_to_file(response: Response, path: &Path) -> std::result::Result<u64, AttemptError> {
    let local = |e: std::io::Error| AttemptError {
        reason: format!("Error writing {}: {}", path.display(), e),
        retryable: false,
    };

    let mut file = File::create(path).await.map_err(local)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AttemptError {
            reason: format!("Error reading response chunk: {}", e),
            retryable: true,
        })?;
        file.write_all(&chunk).await.map_err(local)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(local)?;
    file.sync_all().await.map_err(local)?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

#[async_trait]
impl GridFetcher for HttpDownloader {
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    async fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(dest);

        let mut retry_count = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            match self.attempt(url, &partial).await {
                Ok(bytes) => {
                    fs::rename(&partial, dest).await?;
                    info!(path = %dest.display(), bytes, "Download completed");
                    return Ok(dest.to_path_buf());
                }
                Err(e) => {
                    fs::remove_file(&partial).await.ok();

                    if !e.retryable || retry_count >= self.config.max_retries {
                        return Err(IngestionError::transport(url, e.reason));
                    }
                    retry_count += 1;

                    warn!(
                        error = %e.reason,
                        retry = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Download failed, retrying"
                    );

                    tokio::time::sleep(delay).await;

                    // Exponential backoff
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                    debug!(next_delay_ms = delay.as_millis() as u64, "Backoff updated");
                }
            }
        }
    }
}
