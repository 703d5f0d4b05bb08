use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::ResultType;

/// Map layer handed to the globe's layer manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Renderer family, e.g. `kml`, `geojson`, `image`, `wms`
    pub kind: String,
    /// Address the renderer loads the data from
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// Browsable listing of further resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub title: String,
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Typed in-memory result produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bytes(Bytes),
    Layer(Layer),
    Catalog(Catalog),
    /// Result of an application-defined handler, tagged with its own type name.
    /// The tag is always [`ResultType::Custom`], even for names like `layer`.
    Custom { kind: String, value: Value },
}

impl Payload {
    /// Runtime type tag of this result
    pub fn result_type(&self) -> ResultType {
        match self {
            Payload::Text(_) => ResultType::Text,
            Payload::Bytes(_) => ResultType::Bytes,
            Payload::Layer(_) => ResultType::Layer,
            Payload::Catalog(_) => ResultType::Catalog,
            Payload::Custom { kind, .. } => ResultType::custom(kind),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_layer(&self) -> Option<&Layer> {
        match self {
            Payload::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_catalog(&self) -> Option<&Catalog> {
        match self {
            Payload::Catalog(catalog) => Some(catalog),
            _ => None,
        }
    }
}
