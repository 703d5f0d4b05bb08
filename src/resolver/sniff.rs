//! Content sniffing from leading bytes

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::SniffConfig;
use crate::intent::ContentType;

pub const KML: &str = "application/vnd.google-earth.kml+xml";
pub const KMZ: &str = "application/vnd.google-earth.kmz";
pub const GEOJSON: &str = "application/geo+json";
pub const WMS_CAPABILITIES: &str = "application/vnd.ogc.wms_xml";

#[derive(Debug, Error)]
pub enum SniffError {
    /// The sniffing backend is not ready yet; worth retrying shortly
    #[error("sniffer unavailable: {0}")]
    Unavailable(String),

    #[error("sniffing failed: {0}")]
    Failed(String),
}

/// Detects a content type from the first bytes of a resource
pub trait Sniffer: Send + Sync {
    fn sniff(&self, bytes: &[u8]) -> Result<Option<ContentType>, SniffError>;
}

/// Bounded retry while a sniffer reports [`SniffError::Unavailable`]
#[derive(Debug, Clone, Copy)]
pub struct SniffPolicy {
    pub max_bytes: usize,
    pub attempts: u32,
    pub backoff: Duration,
}

impl SniffPolicy {
    pub fn from_config(config: &SniffConfig) -> Self {
        Self {
            max_bytes: config.max_bytes.as_usize(),
            attempts: config.retries.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

impl Default for SniffPolicy {
    fn default() -> Self {
        Self::from_config(&SniffConfig::default())
    }
}

/// Run `sniffer`, retrying with linear backoff while it is unavailable
pub async fn sniff_with_retry(
    sniffer: &dyn Sniffer,
    bytes: &[u8],
    policy: &SniffPolicy,
) -> Result<Option<ContentType>, SniffError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match sniffer.sniff(bytes) {
            Err(SniffError::Unavailable(reason)) if attempt < policy.attempts => {
                debug!(attempt, %reason, "Sniffer unavailable, retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            other => return other,
        }
    }
}

/// Magic-number sniffer covering the formats the globe loads
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicSniffer;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
];

impl MagicSniffer {
    fn detect(bytes: &[u8]) -> Option<&'static str> {
        if let Some((_, essence)) = SIGNATURES.iter().find(|(magic, _)| bytes.starts_with(magic)) {
            return Some(*essence);
        }

        let text = leading_text(bytes)?;
        let lower = text.to_ascii_lowercase();

        if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
            return Some("text/html");
        }

        if lower.starts_with('<') {
            if lower.contains("<kml") {
                return Some(KML);
            }
            if lower.contains("wms_capabilities") || lower.contains("wmt_ms_capabilities") {
                return Some(WMS_CAPABILITIES);
            }
            return Some("application/xml");
        }

        if lower.starts_with('{') || lower.starts_with('[') {
            if lower.contains("\"featurecollection\"") || lower.contains("\"feature\"") {
                return Some(GEOJSON);
            }
            return Some("application/json");
        }

        Some("text/plain")
    }
}

impl Sniffer for MagicSniffer {
    fn sniff(&self, bytes: &[u8]) -> Result<Option<ContentType>, SniffError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Self::detect(bytes).and_then(|essence| ContentType::parse(essence).ok()))
    }
}

/// Decoded text with BOM and leading whitespace removed, if the bytes look textual.
///
/// A multi-byte character cut at the end of the sample is tolerated.
fn leading_text(bytes: &[u8]) -> Option<&str> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&bytes[..e.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };

    if text.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return None;
    }

    Some(text.trim_start())
}
