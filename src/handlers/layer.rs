//! Layer handler: turns geospatial documents and imagery into [`Layer`]s
//!
//! | content type | kind | document read |
//! |---|---|---|
//! | KML | `kml` | yes, for the document `<name>` |
//! | KMZ | `kml` | no |
//! | GeoJSON | `geojson` | yes, validated and features counted |
//! | WMS capabilities | `wms` | yes, for the service `<Title>` |
//! | `image/*` | `image` | no |
//! | `application/json` | from the descriptor | yes, a serialized layer descriptor |

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::context::ExecutionContext;
use super::traits::{HandlerError, HandlerFactory, HandlerInput, IntentHandler};
use crate::fetch::Fetcher;
use crate::intent::{ContentType, Layer, Payload, ResultType};
use crate::resolver::guess_from_path;
use crate::resolver::sniff::{GEOJSON, KML, KMZ, WMS_CAPABILITIES};

const GEOJSON_TYPES: &[&str] = &[
    "FeatureCollection",
    "Feature",
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

pub struct LayerFactory;

impl HandlerFactory for LayerFactory {
    fn name(&self) -> &str {
        "layer"
    }

    fn produces(&self) -> ResultType {
        ResultType::Layer
    }

    fn build(&self, ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| HandlerError::Construction(e.to_string()))
        };

        Ok(Box::new(LayerHandler {
            fetcher: ctx.fetcher().clone(),
            kml_name: compile(r"(?is)<name>\s*(.*?)\s*</name>")?,
            wms_title: compile(r"(?is)<Title>\s*(.*?)\s*</Title>")?,
        }))
    }
}

struct LayerHandler {
    fetcher: Arc<Fetcher>,
    kml_name: Regex,
    wms_title: Regex,
}

/// Layer record as written in a JSON descriptor; `source` may be relative
#[derive(Debug, Deserialize)]
struct Descriptor {
    name: Option<String>,
    kind: String,
    source: Option<String>,
    content_type: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
}

impl LayerHandler {
    async fn text(&self, url: &Url) -> Result<String, HandlerError> {
        let bytes = self.fetcher.fetch(url).await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| HandlerError::Decode(e.to_string()))
    }

    fn first_capture(pattern: &Regex, document: &str) -> Option<String> {
        pattern
            .captures(document)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn layer(
        input: &HandlerInput,
        kind: &str,
        content_type: &ContentType,
        document_name: Option<String>,
    ) -> Layer {
        Layer {
            name: display_name(input, document_name),
            kind: kind.to_string(),
            source: input.address.url().to_string(),
            content_type: Some(content_type.essence().to_string()),
            properties: BTreeMap::new(),
        }
    }

    async fn geojson(
        &self,
        input: &HandlerInput,
        content_type: &ContentType,
    ) -> Result<Layer, HandlerError> {
        let document: Value = serde_json::from_str(&self.text(input.address.url()).await?)
            .map_err(|e| HandlerError::Decode(e.to_string()))?;

        let kind = document.get("type").and_then(Value::as_str).unwrap_or_default();
        if !GEOJSON_TYPES.contains(&kind) {
            return Err(HandlerError::Decode(format!("not a GeoJSON object: type '{kind}'")));
        }

        let features = match document.get("features").and_then(Value::as_array) {
            Some(features) => features.len(),
            None => 1,
        };
        let document_name = document
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut layer = Self::layer(input, "geojson", content_type, document_name);
        layer
            .properties
            .insert("feature_count".to_string(), Value::from(features));
        Ok(layer)
    }

    async fn descriptor(&self, input: &HandlerInput) -> Result<Layer, HandlerError> {
        let descriptor: Descriptor = serde_json::from_str(&self.text(input.address.url()).await?)
            .map_err(|e| HandlerError::Decode(format!("invalid layer descriptor: {e}")))?;

        let source = match descriptor.source {
            Some(source) => input
                .address
                .url()
                .join(&source)
                .map_err(|e| HandlerError::Decode(format!("invalid layer source: {e}")))?
                .to_string(),
            None => input.address.url().to_string(),
        };

        Ok(Layer {
            name: display_name(input, descriptor.name),
            kind: descriptor.kind,
            source,
            content_type: descriptor.content_type,
            properties: descriptor.properties,
        })
    }
}

#[async_trait]
impl IntentHandler for LayerHandler {
    async fn handle(&self, input: &HandlerInput) -> Result<Payload, HandlerError> {
        let content_type = input
            .intent
            .content_type()
            .cloned()
            .or_else(|| guess_from_path(input.address.url().path()))
            .ok_or_else(|| HandlerError::Decode("content type unknown".to_string()))?;
        debug!(
            intent_id = %input.intent.id(),
            content_type = %content_type,
            "Building layer"
        );

        let layer = match content_type.essence() {
            KML => {
                let document = self.text(input.address.url()).await?;
                let name = Self::first_capture(&self.kml_name, &document);
                Self::layer(input, "kml", &content_type, name)
            }
            KMZ => Self::layer(input, "kml", &content_type, None),
            GEOJSON => self.geojson(input, &content_type).await?,
            WMS_CAPABILITIES => {
                let document = self.text(input.address.url()).await?;
                let title = Self::first_capture(&self.wms_title, &document);
                Self::layer(input, "wms", &content_type, title)
            }
            "application/json" => self.descriptor(input).await?,
            _ if content_type.mime().type_() == mime::IMAGE => {
                Self::layer(input, "image", &content_type, None)
            }
            other => {
                return Err(HandlerError::Decode(format!(
                    "no layer representation for {other}"
                )));
            }
        };

        Ok(Payload::Layer(layer))
    }
}

/// Caller-supplied `name` metadata, then the document's own name, then the
/// last path segment
fn display_name(input: &HandlerInput, document_name: Option<String>) -> String {
    if let Some(name) = input.intent.meta("name") {
        return name.to_string();
    }
    if let Some(name) = document_name {
        return name;
    }

    input
        .address
        .url()
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| input.address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::intent::{Address, Intent};
    use std::fs;
    use tempfile::TempDir;

    fn handler() -> Box<dyn IntentHandler> {
        let ctx = ExecutionContext::new(Arc::new(Fetcher::new(&FetchConfig::default()).unwrap()));
        ctx.instantiate(&LayerFactory).unwrap()
    }

    fn input(path: &std::path::Path, content_type: Option<&str>) -> HandlerInput {
        let url = Url::from_file_path(path).unwrap();
        HandlerInput {
            intent: Intent::builder()
                .uri(url.as_str())
                .maybe_content_type(content_type.map(|t| ContentType::parse(t).unwrap()))
                .build(),
            address: Address::identity(url),
        }
    }

    #[tokio::test]
    async fn test_kml_name_from_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rivers.kml");
        fs::write(
            &path,
            "<kml><Document>\n  <name> Major rivers </name>\n</Document></kml>",
        )
        .unwrap();

        let payload = handler().handle(&input(&path, Some(KML))).await.unwrap();
        let layer = payload.as_layer().unwrap();
        assert_eq!(layer.name, "Major rivers");
        assert_eq!(layer.kind, "kml");
        assert!(layer.source.starts_with("file://"));
    }

    #[tokio::test]
    async fn test_geojson_counts_features() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wells.geojson");
        fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature"},{"type":"Feature"}]}"#,
        )
        .unwrap();

        let payload = handler().handle(&input(&path, None)).await.unwrap();
        let layer = payload.as_layer().unwrap();
        assert_eq!(layer.kind, "geojson");
        assert_eq!(layer.name, "wells.geojson");
        assert_eq!(layer.properties["feature_count"], Value::from(2));
    }

    #[tokio::test]
    async fn test_geojson_rejects_other_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.geojson");
        fs::write(&path, r#"{"type":"Topology"}"#).unwrap();

        let result = handler().handle(&input(&path, None)).await;
        assert!(matches!(result, Err(HandlerError::Decode(_))));
    }

    #[tokio::test]
    async fn test_descriptor_resolves_relative_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layer.json");
        fs::write(
            &path,
            r#"{"name":"Elevation","kind":"terrain","source":"tiles/elevation","properties":{"max_level":12}}"#,
        )
        .unwrap();

        let payload = handler()
            .handle(&input(&path, Some("application/json")))
            .await
            .unwrap();
        let layer = payload.as_layer().unwrap();
        assert_eq!(layer.name, "Elevation");
        assert_eq!(layer.kind, "terrain");
        assert!(layer.source.ends_with("/tiles/elevation"));
        assert_eq!(layer.properties["max_level"], Value::from(12));
    }

    #[tokio::test]
    async fn test_image_needs_no_read_and_honours_name_metadata() {
        let url = Url::parse("https://tiles.example.org/blue-marble.png").unwrap();
        let input = HandlerInput {
            intent: Intent::builder()
                .uri(url.as_str())
                .content_type(ContentType::parse("image/png").unwrap())
                .build()
                .with_meta("name", "Blue Marble"),
            address: Address::identity(url),
        };

        let payload = handler().handle(&input).await.unwrap();
        let layer = payload.as_layer().unwrap();
        assert_eq!(layer.kind, "image");
        assert_eq!(layer.name, "Blue Marble");
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let url = Url::parse("https://example.org/report.pdf").unwrap();
        let input = HandlerInput {
            intent: Intent::for_uri(url.as_str()),
            address: Address::identity(url),
        };

        let result = handler().handle(&input).await;
        assert!(matches!(result, Err(HandlerError::Decode(_))));
    }
}
