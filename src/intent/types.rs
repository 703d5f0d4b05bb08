use mime::Mime;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier attached to every intent for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(Uuid);

impl IntentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IntentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// MIME content type of an addressed resource.
///
/// Matching works on the essence (`type/subtype+suffix`), so parameters such as
/// `charset` never affect routing. A pattern may use `*` for either part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentType(Mime);

/// Labels that origins attach to content they know nothing about.
const GENERIC_ESSENCES: &[&str] = &[
    "text/xml",
    "application/xml",
    "text/plain",
    "application/octet-stream",
];

impl ContentType {
    pub fn new(mime: Mime) -> Self {
        Self(mime)
    }

    pub fn parse(value: &str) -> Result<Self, mime::FromStrError> {
        value.trim().parse::<Mime>().map(Self)
    }

    pub fn mime(&self) -> &Mime {
        &self.0
    }

    pub fn essence(&self) -> &str {
        self.0.essence_str()
    }

    /// Whether this type is one of the catch-all labels that should be re-sniffed
    pub fn is_generic(&self) -> bool {
        GENERIC_ESSENCES
            .iter()
            .any(|g| self.essence().eq_ignore_ascii_case(g))
    }

    /// Whether `self` satisfies `pattern` (which may contain wildcards)
    pub fn matches(&self, pattern: &ContentType) -> bool {
        let type_ok = pattern.0.type_() == mime::STAR || pattern.0.type_() == self.0.type_();
        if !type_ok {
            return false;
        }

        if pattern.0.subtype() == mime::STAR {
            return true;
        }

        pattern.0.subtype() == self.0.subtype() && pattern.0.suffix() == self.0.suffix()
    }
}

impl FromStr for ContentType {
    type Err = mime::FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentType {
    type Error = mime::FromStrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        value.0.to_string()
    }
}

impl From<Mime> for ContentType {
    fn from(mime: Mime) -> Self {
        Self(mime)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Explicit type tag for results produced by handlers.
///
/// Tags form a single-parent hierarchy rooted at [`ResultType::Any`]:
///
/// ```text
/// Any ─┬─ Text
///      ├─ Bytes
///      ├─ Custom(..)
///      └─ Document ─┬─ Layer
///                   └─ Catalog
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultType {
    Any,
    Text,
    Bytes,
    Document,
    Layer,
    Catalog,
    Custom(CustomType),
}

const RESERVED_NAMES: &[&str] = &["any", "text", "string", "bytes", "document", "layer", "catalog"];
const RESERVED_PREFIX: &str = "custom:";

/// Name of an application-defined result type.
///
/// Never equal to a built-in name: `layer` becomes `custom:layer`, so a
/// custom payload cannot pass for a built-in one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomType(String);

impl CustomType {
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        if RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r)) {
            Self(format!("{RESERVED_PREFIX}{name}"))
        } else {
            Self(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ResultType {
    /// Tag for an application-defined result, whatever its name
    pub fn custom(name: &str) -> Self {
        ResultType::Custom(CustomType::new(name))
    }

    pub fn parent(&self) -> Option<ResultType> {
        match self {
            ResultType::Any => None,
            ResultType::Layer | ResultType::Catalog => Some(ResultType::Document),
            ResultType::Text
            | ResultType::Bytes
            | ResultType::Document
            | ResultType::Custom(_) => Some(ResultType::Any),
        }
    }

    /// This tag followed by each ancestor, most specific first
    pub fn lineage(&self) -> Vec<ResultType> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(tag) = current {
            current = tag.parent();
            chain.push(tag);
        }
        chain
    }

    /// Whether a value tagged `self` can stand in where `target` is required
    pub fn is_assignable_to(&self, target: &ResultType) -> bool {
        self.lineage().iter().any(|tag| tag == target)
    }

    /// Whether a handler declaring `self` might produce a `required` value:
    /// true when either tag is an ancestor of (or equal to) the other
    pub fn may_produce(&self, required: &ResultType) -> bool {
        self.is_assignable_to(required) || required.is_assignable_to(self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResultType::Any => "any",
            ResultType::Text => "text",
            ResultType::Bytes => "bytes",
            ResultType::Document => "document",
            ResultType::Layer => "layer",
            ResultType::Catalog => "catalog",
            ResultType::Custom(name) => name.as_str(),
        }
    }
}

impl From<&str> for ResultType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" => ResultType::Any,
            "text" | "string" => ResultType::Text,
            "bytes" => ResultType::Bytes,
            "document" => ResultType::Document,
            "layer" => ResultType::Layer,
            "catalog" => ResultType::Catalog,
            _ => ResultType::custom(value),
        }
    }
}

impl From<String> for ResultType {
    fn from(value: String) -> Self {
        ResultType::from(value.as_str())
    }
}

impl From<ResultType> for String {
    fn from(value: ResultType) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for ResultType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ResultType::from(s))
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an address was obtained from an intent's URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOrigin {
    /// A registered locator translated the URI
    Locator(String),
    /// No locator claimed the URI; it was used as-is
    Identity,
}

/// Retrievable location of the resource an intent refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    url: Url,
    origin: AddressOrigin,
}

impl Address {
    pub fn located(url: Url, locator: impl Into<String>) -> Self {
        Self {
            url,
            origin: AddressOrigin::Locator(locator.into()),
        }
    }

    pub fn identity(url: Url) -> Self {
        Self {
            url,
            origin: AddressOrigin::Identity,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn origin(&self) -> &AddressOrigin {
        &self.origin
    }

    pub fn is_identity(&self) -> bool {
        self.origin == AddressOrigin::Identity
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_ignores_parameters() {
        let ct = ContentType::parse("text/html; charset=utf-8").unwrap();
        assert_eq!(ct.essence(), "text/html");
        assert!(ct.matches(&ContentType::parse("text/html").unwrap()));
    }

    #[test]
    fn test_content_type_wildcards() {
        let png = ContentType::parse("image/png").unwrap();
        assert!(png.matches(&ContentType::parse("image/*").unwrap()));
        assert!(png.matches(&ContentType::parse("*/*").unwrap()));
        assert!(!png.matches(&ContentType::parse("text/*").unwrap()));
        assert!(!png.matches(&ContentType::parse("image/jpeg").unwrap()));
    }

    #[test]
    fn test_content_type_suffix_is_significant() {
        let kml = ContentType::parse("application/vnd.google-earth.kml+xml").unwrap();
        let plain = ContentType::parse("application/vnd.google-earth.kml").unwrap();
        assert!(!kml.matches(&plain));
        assert!(kml.matches(&kml.clone()));
    }

    #[test]
    fn test_generic_labels() {
        assert!(ContentType::parse("text/xml").unwrap().is_generic());
        assert!(ContentType::parse("Application/XML").unwrap().is_generic());
        assert!(!ContentType::parse("image/png").unwrap().is_generic());
    }

    #[test]
    fn test_result_type_lineage() {
        assert_eq!(
            ResultType::Layer.lineage(),
            vec![ResultType::Layer, ResultType::Document, ResultType::Any]
        );
        assert_eq!(ResultType::Any.lineage(), vec![ResultType::Any]);
    }

    #[test]
    fn test_result_type_assignability() {
        assert!(ResultType::Layer.is_assignable_to(&ResultType::Document));
        assert!(ResultType::Catalog.is_assignable_to(&ResultType::Any));
        assert!(!ResultType::Text.is_assignable_to(&ResultType::Layer));
        assert!(!ResultType::Document.is_assignable_to(&ResultType::Layer));
    }

    #[test]
    fn test_result_type_may_produce() {
        assert!(ResultType::Document.may_produce(&ResultType::Layer));
        assert!(ResultType::Any.may_produce(&ResultType::Text));
        assert!(ResultType::Layer.may_produce(&ResultType::Any));
        assert!(!ResultType::Text.may_produce(&ResultType::Layer));
        assert!(!ResultType::custom("terrain").may_produce(&ResultType::Document));
    }

    #[test]
    fn test_result_type_parsing() {
        assert_eq!("Layer".parse::<ResultType>().unwrap(), ResultType::Layer);
        assert_eq!(ResultType::from("string"), ResultType::Text);
        assert_eq!(ResultType::from("terrain"), ResultType::custom("terrain"));
        assert_eq!(ResultType::custom("terrain").as_str(), "terrain");
    }

    #[test]
    fn test_custom_type_never_aliases_builtin() {
        let tag = ResultType::custom("Layer");
        assert_ne!(tag, ResultType::Layer);
        assert_eq!(tag.as_str(), "custom:Layer");
        assert!(!tag.is_assignable_to(&ResultType::Layer));
        assert!(!tag.is_assignable_to(&ResultType::Document));

        // Round-trips through its string form without turning built-in
        assert_eq!(ResultType::from(tag.to_string()), tag);
    }
}
