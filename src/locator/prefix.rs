use reqwest::Url;

use super::traits::{LocateError, Locator};
use crate::intent::Intent;

/// Rewrites URIs starting with `prefix` onto a base URL.
///
/// `catalog:rivers.json` with prefix `catalog:` and replacement
/// `https://catalog.example.org/` becomes
/// `https://catalog.example.org/rivers.json`.
#[derive(Debug, Clone)]
pub struct PrefixLocator {
    name: String,
    prefix: String,
    replacement: String,
}

impl PrefixLocator {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            replacement: replacement.into(),
        }
    }
}

impl Locator for PrefixLocator {
    fn name(&self) -> &str {
        &self.name
    }

    fn locate(&self, intent: &Intent) -> Result<Option<Url>, LocateError> {
        let Some(rest) = intent.uri().strip_prefix(&self.prefix) else {
            return Ok(None);
        };

        let rewritten = format!("{}{}", self.replacement, rest);
        Url::parse(&rewritten)
            .map(Some)
            .map_err(|e| LocateError::Malformed {
                value: rewritten,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> PrefixLocator {
        PrefixLocator::new("catalog", "catalog:", "https://catalog.example.org/")
    }

    #[test]
    fn test_rewrites_matching_prefix() {
        let url = locator()
            .locate(&Intent::for_uri("catalog:rivers/index.json"))
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://catalog.example.org/rivers/index.json");
    }

    #[test]
    fn test_ignores_other_uris() {
        let result = locator()
            .locate(&Intent::for_uri("https://elsewhere.org/x"))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_bad_replacement_is_an_error() {
        let locator = PrefixLocator::new("broken", "x:", "not a base ");
        let result = locator.locate(&Intent::for_uri("x:y"));
        assert!(matches!(result, Err(LocateError::Malformed { .. })));
    }
}
