//! Retrieval of addressed resources
//!
//! [`Fetcher`] is the one service handlers and resolvers use to read bytes:
//! `http`/`https` go through [`HttpClient`], `file` URLs are read from disk.

mod http;

pub use http::HttpClient;

use bytes::Bytes;
use reqwest::Url;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Connection timeout")]
    Timeout,

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Invalid file URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Body exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Client errors and local failures are not worth repeating
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RequestFailed(_) | FetchError::Timeout => true,
            FetchError::Status { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Leading bytes of a resource plus whatever type the transport declared
#[derive(Debug, Clone)]
pub struct Prefix {
    pub declared: Option<String>,
    pub bytes: Bytes,
}

pub struct Fetcher {
    http: HttpClient,
    max_body_bytes: u64,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            max_body_bytes: config.max_body_bytes.as_u64(),
        })
    }

    /// Read the whole resource
    pub async fn fetch(&self, url: &Url) -> Result<Bytes> {
        match url.scheme() {
            "http" | "https" => self.http.download(url).await,
            "file" => {
                let path = file_path(url)?;
                let size = tokio::fs::metadata(&path).await?.len();
                if size > self.max_body_bytes {
                    return Err(FetchError::TooLarge {
                        limit: self.max_body_bytes,
                    });
                }
                let bytes = tokio::fs::read(&path).await?;
                debug!(path = %path.display(), size = bytes.len(), "File read");
                Ok(Bytes::from(bytes))
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Read at most `limit` leading bytes, for content sniffing
    pub async fn fetch_prefix(&self, url: &Url, limit: usize) -> Result<Prefix> {
        match url.scheme() {
            "http" | "https" => self.http.prefix(url, limit).await,
            "file" => {
                let path = file_path(url)?;
                let file = tokio::fs::File::open(&path).await?;
                let mut buffer = Vec::with_capacity(limit);
                file.take(limit as u64).read_to_end(&mut buffer).await?;
                Ok(Prefix {
                    declared: None,
                    bytes: Bytes::from(buffer),
                })
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn file_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path()
        .map_err(|_| FetchError::InvalidUrl(url.to_string()))
}
