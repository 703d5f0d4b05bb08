//! Routing table mapping content types and URI patterns to handlers

mod registry;
mod types;

pub use registry::{FilterId, FilterRegistry};
pub use types::{Filter, FilterError};

use crate::config::FilterConfig;
use crate::resolver::sniff::{GEOJSON, KML, KMZ, WMS_CAPABILITIES};

fn route(
    name: &str,
    priority: i32,
    content_types: &[&str],
    uri_pattern: Option<&str>,
    handler: &str,
) -> FilterConfig {
    FilterConfig {
        name: name.to_string(),
        priority,
        content_types: content_types.iter().map(|t| t.to_string()).collect(),
        uri_pattern: uri_pattern.map(str::to_string),
        handler: handler.to_string(),
    }
}

/// Routing table used when the configuration declares no filters
pub fn default_filters() -> Vec<FilterConfig> {
    vec![
        route(
            "catalogs",
            50,
            &["application/vnd.intentbox.catalog+json"],
            Some(r"(?i)(^catalog:|/catalog[^/]*\.json$)"),
            "catalog",
        ),
        route("kml", 40, &[KML, KMZ], Some(r"(?i)\.km[lz]$"), "layer"),
        route("geojson", 40, &[GEOJSON], Some(r"(?i)\.geojson$"), "layer"),
        route("wms", 40, &[WMS_CAPABILITIES], Some(r"(?i)service=wms"), "layer"),
        route("imagery", 30, &["image/*"], None, "layer"),
        route("layer-descriptors", 20, &["application/json"], None, "layer"),
        route("text", 10, &["text/*", "application/xml"], None, "text"),
        route("binary", -100, &["*/*"], None, "bytes"),
    ]
}
