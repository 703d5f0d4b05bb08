use async_trait::async_trait;
use std::sync::Arc;

use super::extension::guess_from_path;
use super::sniff::{SniffPolicy, Sniffer, sniff_with_retry};
use super::traits::{ContentTypeResolver, ResolveError};
use crate::fetch::Fetcher;
use crate::intent::{Address, ContentType, Intent};

/// Resolves local files by sniffing their first bytes.
///
/// Containers such as ZIP say little about what they hold (a KMZ is a ZIP),
/// so a more specific extension match overrides a sniffed container type.
pub struct FileResolver {
    fetcher: Arc<Fetcher>,
    sniffer: Arc<dyn Sniffer>,
    policy: SniffPolicy,
}

const CONTAINERS: &[&str] = &["application/zip", "application/gzip", "text/plain"];

impl FileResolver {
    pub fn new(fetcher: Arc<Fetcher>, sniffer: Arc<dyn Sniffer>, policy: SniffPolicy) -> Self {
        Self {
            fetcher,
            sniffer,
            policy,
        }
    }
}

#[async_trait]
impl ContentTypeResolver for FileResolver {
    fn name(&self) -> &str {
        "file"
    }

    fn supports(&self, address: &Address, _intent: &Intent) -> bool {
        address.scheme() == "file"
    }

    async fn resolve(
        &self,
        address: &Address,
        _intent: &Intent,
    ) -> Result<Option<ContentType>, ResolveError> {
        let prefix = self
            .fetcher
            .fetch_prefix(address.url(), self.policy.max_bytes)
            .await?;
        let sniffed = sniff_with_retry(self.sniffer.as_ref(), &prefix.bytes, &self.policy).await?;
        let guessed = guess_from_path(address.url().path());

        Ok(match sniffed {
            Some(sniffed) if CONTAINERS.contains(&sniffed.essence()) => guessed.or(Some(sniffed)),
            Some(sniffed) => Some(sniffed),
            None => guessed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::resolver::sniff::{KML, KMZ, MagicSniffer};
    use reqwest::Url;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> FileResolver {
        let fetcher = Arc::new(Fetcher::new(&FetchConfig::default()).unwrap());
        FileResolver::new(fetcher, Arc::new(MagicSniffer), SniffPolicy::default())
    }

    async fn resolve(path: &std::path::Path) -> Option<String> {
        let address = Address::identity(Url::from_file_path(path).unwrap());
        let intent = Intent::for_uri(address.url().as_str());
        resolver()
            .resolve(&address, &intent)
            .await
            .unwrap()
            .map(|ct| ct.essence().to_string())
    }

    #[tokio::test]
    async fn test_sniffs_content_over_misleading_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.txt");
        fs::write(&path, b"\x89PNG\r\n\x1a\n0000").unwrap();

        assert_eq!(resolve(&path).await.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_extension_refines_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("places.kmz");
        fs::write(&path, b"PK\x03\x04payload").unwrap();

        assert_eq!(resolve(&path).await.as_deref(), Some(KMZ));
    }

    #[tokio::test]
    async fn test_kml_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc");
        fs::write(&path, "<?xml version=\"1.0\"?>\n<kml></kml>").unwrap();

        assert_eq!(resolve(&path).await.as_deref(), Some(KML));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let address = Address::identity(Url::parse("file:///no/such/file.kml").unwrap());
        let intent = Intent::for_uri("file:///no/such/file.kml");
        let result = resolver().resolve(&address, &intent).await;
        assert!(matches!(result, Err(ResolveError::Io(_))));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layer.geojson");
        fs::write(&path, r#"{"type":"FeatureCollection","features":[]}"#).unwrap();

        let first = resolve(&path).await;
        let second = resolve(&path).await;
        assert_eq!(first, second);
        assert!(first.is_some());
    }
}
