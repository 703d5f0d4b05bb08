use async_trait::async_trait;

use super::sniff::{GEOJSON, KML, KMZ};
use super::traits::{ContentTypeResolver, ResolveError};
use crate::intent::{Address, ContentType, Intent};

const EXTENSIONS: &[(&str, &str)] = &[
    ("kml", KML),
    ("kmz", KMZ),
    ("geojson", GEOJSON),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
];

/// Guess a content type from the last path segment's extension
pub fn guess_from_path(path: &str) -> Option<ContentType> {
    let segment = path.rsplit('/').next()?;
    let (_, extension) = segment.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();

    EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .and_then(|(_, essence)| ContentType::parse(essence).ok())
}

/// Last-resort resolver working from the URL path alone
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionResolver;

#[async_trait]
impl ContentTypeResolver for ExtensionResolver {
    fn name(&self) -> &str {
        "extension"
    }

    fn supports(&self, address: &Address, _intent: &Intent) -> bool {
        address.url().path().contains('.')
    }

    async fn resolve(
        &self,
        address: &Address,
        _intent: &Intent,
    ) -> Result<Option<ContentType>, ResolveError> {
        Ok(guess_from_path(address.url().path()))
    }
}
