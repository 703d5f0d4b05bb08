//! Intent record and the value types that flow through the pipeline
//!
//! An [`Intent`] is built by a caller, annotated by the pipeline stages
//! (the resolver chain fills in the content type) and handed back to the
//! caller's callback together with the outcome.
//!
//! ```rust,ignore
//! use intentbox::intent::{Intent, ResultType};
//!
//! let intent = Intent::builder()
//!     .uri("https://example.org/layers/rivers.kml")
//!     .required_return_type(ResultType::Layer)
//!     .build();
//! ```

mod payload;
mod types;

pub use payload::{Catalog, CatalogEntry, Layer, Payload};
pub use types::{Address, AddressOrigin, ContentType, CustomType, IntentId, ResultType};

use bon::Builder;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A request to resolve an opaque resource reference into a typed result
#[derive(Debug, Clone, Builder)]
pub struct Intent {
    #[builder(default)]
    id: IntentId,
    #[builder(into)]
    uri: String,
    /// Caller-supplied type; when present the resolver chain is skipped
    content_type: Option<ContentType>,
    expected_return_type: Option<ResultType>,
    required_return_type: Option<ResultType>,
    #[builder(into)]
    explicit_handler: Option<String>,
    #[builder(default)]
    metadata: BTreeMap<String, String>,
    #[builder(default = Utc::now())]
    submitted_at: DateTime<Utc>,
}

impl Intent {
    /// Shorthand for an intent with nothing but a URI
    pub fn for_uri(uri: impl Into<String>) -> Self {
        Self::builder().uri(uri).build()
    }

    pub fn id(&self) -> IntentId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    pub fn expected_return_type(&self) -> Option<&ResultType> {
        self.expected_return_type.as_ref()
    }

    pub fn required_return_type(&self) -> Option<&ResultType> {
        self.required_return_type.as_ref()
    }

    pub fn explicit_handler(&self) -> Option<&str> {
        self.explicit_handler.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Record the resolved content type.
    ///
    /// Only the first call has an effect; returns `false` when a type was
    /// already present.
    pub(crate) fn set_content_type(&mut self, content_type: ContentType) -> bool {
        if self.content_type.is_some() {
            return false;
        }
        self.content_type = Some(content_type);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let intent = Intent::builder().uri("file:///tmp/a.kml").build();
        assert_eq!(intent.uri(), "file:///tmp/a.kml");
        assert!(intent.content_type().is_none());
        assert!(intent.explicit_handler().is_none());
        assert!(intent.metadata().is_empty());
    }

    #[test]
    fn test_builder_hints() {
        let intent = Intent::builder()
            .uri("catalog:root")
            .required_return_type(ResultType::Catalog)
            .expected_return_type(ResultType::Document)
            .explicit_handler("catalog")
            .build()
            .with_meta("caller", "tree");

        assert_eq!(intent.required_return_type(), Some(&ResultType::Catalog));
        assert_eq!(intent.expected_return_type(), Some(&ResultType::Document));
        assert_eq!(intent.explicit_handler(), Some("catalog"));
        assert_eq!(intent.meta("caller"), Some("tree"));
    }

    #[test]
    fn test_content_type_set_once() {
        let mut intent = Intent::for_uri("https://example.org/data");
        assert!(intent.set_content_type(ContentType::parse("image/png").unwrap()));
        assert!(!intent.set_content_type(ContentType::parse("text/plain").unwrap()));
        assert_eq!(intent.content_type().unwrap().essence(), "image/png");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Intent::for_uri("a:1");
        let b = Intent::for_uri("a:1");
        assert_ne!(a.id(), b.id());
    }
}
