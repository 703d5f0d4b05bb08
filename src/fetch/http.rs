//! HTTP retrieval for handlers and resolvers

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

use super::{FetchError, Prefix, Result};
use crate::config::FetchConfig;

/// Upper bound on a single retry sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff from `base` for the given 1-based attempt, capped at
/// [`MAX_BACKOFF`]
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// HTTP client with retry for full-body downloads
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
    max_body_bytes: u64,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_body_bytes: config.max_body_bytes.as_u64(),
        })
    }

    /// Download a full body, retrying transient failures
    pub async fn download(&self, url: &Url) -> Result<Bytes> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.download_once(url).await {
                Ok(bytes) => {
                    if attempts > 1 {
                        debug!(%url, attempts, "Download succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempts >= self.max_retries {
                        warn!(%url, attempts, error = %e, "Download failed after retries");
                        return Err(FetchError::RequestFailed(format!(
                            "failed after {} attempts: {}",
                            attempts, e
                        )));
                    }

                    warn!(%url, attempts, error = %e, "Download failed, retrying");

                    tokio::time::sleep(backoff_delay(self.retry_backoff, attempts)).await;
                }
            }
        }
    }

    async fn download_once(&self, url: &Url) -> Result<Bytes> {
        debug!(%url, "Starting download");

        let response = self.send(self.client.get(url.clone())).await?;
        check_status(response.status())?;

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("failed to read body: {}", e)))?;

        if bytes.len() as u64 > self.max_body_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_body_bytes,
            });
        }

        debug!(%url, size = bytes.len(), "Download completed");
        Ok(bytes)
    }

    /// Fetch the declared content type and at most `limit` leading bytes.
    ///
    /// Asks for a byte range; servers that ignore it are cut off after
    /// `limit` bytes.
    pub async fn prefix(&self, url: &Url, limit: usize) -> Result<Prefix> {
        let mut request = self.client.get(url.clone());
        if limit > 0 {
            request = request.header(RANGE, format!("bytes=0-{}", limit - 1));
        }

        let mut response = self.send(request).await?;
        let status = response.status();

        // An empty resource cannot satisfy any range
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Prefix {
                declared: declared_type(&response),
                bytes: Bytes::new(),
            });
        }
        check_status(status)?;

        let declared = declared_type(&response);
        let mut buffer = Vec::with_capacity(limit);
        while buffer.len() < limit {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| FetchError::RequestFailed(format!("failed to read body: {}", e)))?;
            match chunk {
                Some(chunk) => {
                    let take = chunk.len().min(limit - buffer.len());
                    buffer.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }

        debug!(%url, size = buffer.len(), declared = ?declared, "Prefix fetched");

        Ok(Prefix {
            declared,
            bytes: Bytes::from(buffer),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_redirect() {
                FetchError::TooManyRedirects
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    Err(FetchError::Status {
        code: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

fn declared_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
