use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::context::ExecutionContext;
use super::traits::{HandlerError, HandlerFactory, HandlerInput, IntentHandler};
use crate::fetch::Fetcher;
use crate::intent::{Catalog, CatalogEntry, Payload, ResultType};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogOptions {
    /// Keep at most this many entries
    max_entries: Option<usize>,
}

pub struct CatalogFactory;

impl HandlerFactory for CatalogFactory {
    fn name(&self) -> &str {
        "catalog"
    }

    fn produces(&self) -> ResultType {
        ResultType::Catalog
    }

    fn build(&self, ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
        let options: CatalogOptions = ctx.typed_options(self.name())?;
        Ok(Box::new(CatalogHandler {
            fetcher: ctx.fetcher().clone(),
            max_entries: options.max_entries,
        }))
    }
}

struct CatalogHandler {
    fetcher: Arc<Fetcher>,
    max_entries: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    title: Option<String>,
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

#[async_trait]
impl IntentHandler for CatalogHandler {
    async fn handle(&self, input: &HandlerInput) -> Result<Payload, HandlerError> {
        let base = input.address.url();
        let bytes = self.fetcher.fetch(base).await?;
        let listing: Listing = serde_json::from_slice(&bytes)
            .map_err(|e| HandlerError::Decode(format!("invalid catalog: {e}")))?;

        let limit = self.max_entries.unwrap_or(usize::MAX);
        let mut entries = Vec::with_capacity(listing.entries.len().min(limit));
        for mut entry in listing.entries.into_iter().take(limit) {
            match base.join(&entry.uri) {
                Ok(url) => {
                    entry.uri = url.to_string();
                    entries.push(entry);
                }
                Err(e) => {
                    warn!(
                        intent_id = %input.intent.id(),
                        entry = %entry.uri,
                        error = %e,
                        "Skipping catalog entry with invalid URI"
                    );
                }
            }
        }

        let title = listing
            .title
            .or_else(|| input.intent.meta("name").map(str::to_string))
            .unwrap_or_else(|| base.to_string());

        Ok(Payload::Catalog(Catalog { title, entries }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::intent::{Address, Intent};
    use reqwest::Url;
    use std::fs;
    use tempfile::TempDir;

    fn context() -> ExecutionContext {
        ExecutionContext::new(Arc::new(Fetcher::new(&FetchConfig::default()).unwrap()))
    }

    fn input(path: &std::path::Path) -> HandlerInput {
        let url = Url::from_file_path(path).unwrap();
        HandlerInput {
            intent: Intent::for_uri(url.as_str()),
            address: Address::identity(url),
        }
    }

    const LISTING: &str = r#"{
        "title": "Hydrography",
        "entries": [
            {"title": "Rivers", "uri": "rivers.kml", "content_type": "application/vnd.google-earth.kml+xml"},
            {"title": "Lakes", "uri": "https://data.example.org/lakes.geojson", "description": "Global lakes"},
            {"title": "Basins", "uri": "sub/basins.json"}
        ]
    }"#;

    #[tokio::test]
    async fn test_entries_resolved_against_catalog_address() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, LISTING).unwrap();

        let handler = context().instantiate(&CatalogFactory).unwrap();
        let payload = handler.handle(&input(&path)).await.unwrap();
        let catalog = payload.as_catalog().unwrap();

        assert_eq!(catalog.title, "Hydrography");
        assert_eq!(catalog.entries.len(), 3);
        assert_eq!(
            catalog.entries[0].uri,
            Url::from_file_path(dir.path().join("rivers.kml")).unwrap().to_string()
        );
        assert_eq!(catalog.entries[1].uri, "https://data.example.org/lakes.geojson");
        assert_eq!(catalog.entries[1].description.as_deref(), Some("Global lakes"));
    }

    #[tokio::test]
    async fn test_max_entries_option() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, LISTING).unwrap();

        let ctx = context();
        ctx.set_options("catalog", serde_json::json!({ "max_entries": 1 }));
        let handler = ctx.instantiate(&CatalogFactory).unwrap();
        let payload = handler.handle(&input(&path)).await.unwrap();
        assert_eq!(payload.as_catalog().unwrap().entries.len(), 1);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let ctx = context();
        ctx.set_options("catalog", serde_json::json!({ "max": 1 }));
        assert!(matches!(
            ctx.instantiate(&CatalogFactory),
            Err(HandlerError::InvalidOptions(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let handler = context().instantiate(&CatalogFactory).unwrap();
        let result = handler.handle(&input(&path)).await;
        assert!(matches!(result, Err(HandlerError::Decode(_))));
    }
}
