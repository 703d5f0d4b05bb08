//! Resource locator chain
//!
//! Locators are consulted by descending priority (registration order within
//! a priority). The first one to return a URL wins. When none does, the
//! intent's URI itself is used if it parses as an absolute URL, and the
//! resulting [`Address`] says so via [`AddressOrigin::Identity`].
//!
//! The fallback only covers absolute URIs. A relative reference such as
//! `layers/rivers.kml` has no base to resolve against, so unless a locator
//! claims it (a [`PrefixLocator`] rooted at a base URL, say) it is
//! [`LocateError::Unresolvable`]. Bare absolute paths are claimed by
//! [`FilePathLocator`].
//!
//! [`AddressOrigin::Identity`]: crate::intent::AddressOrigin::Identity

mod file_path;
mod prefix;
mod traits;

pub use file_path::FilePathLocator;
pub use prefix::PrefixLocator;
pub use traits::{LocateError, Locator};

use reqwest::Url;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{LocatorConfig, LocatorKind};
use crate::intent::{Address, Intent};
use crate::registry::{EntryId, PriorityList};

#[derive(Default)]
pub struct LocatorChain {
    locators: PriorityList<dyn Locator>,
}

impl LocatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chain declared in configuration
    pub fn from_config(configs: &[LocatorConfig]) -> Self {
        let chain = Self::new();

        for config in configs {
            let locator: Arc<dyn Locator> = match config.kind {
                LocatorKind::Prefix => Arc::new(PrefixLocator::new(
                    config.name.clone(),
                    config.prefix.clone().unwrap_or_default(),
                    config.replacement.clone().unwrap_or_default(),
                )),
                LocatorKind::FilePath => Arc::new(FilePathLocator::new(config.name.clone())),
            };
            chain.register(config.priority, locator);
        }

        chain
    }

    pub fn register(&self, priority: i32, locator: Arc<dyn Locator>) -> EntryId {
        debug!(locator = locator.name(), priority, "Registering locator");
        self.locators.insert(priority, locator)
    }

    pub fn unregister(&self, id: EntryId) -> bool {
        self.locators.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Translate the intent's URI into an address.
    ///
    /// A locator that errors or panics is logged and skipped.
    pub fn locate(&self, intent: &Intent) -> Result<Address, LocateError> {
        for entry in self.locators.snapshot().iter() {
            let locator = entry.item();
            let outcome = catch_unwind(AssertUnwindSafe(|| locator.locate(intent)));

            match outcome {
                Ok(Ok(Some(url))) => {
                    debug!(
                        intent_id = %intent.id(),
                        locator = locator.name(),
                        %url,
                        "Address located"
                    );
                    return Ok(Address::located(url, locator.name()));
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    warn!(
                        intent_id = %intent.id(),
                        locator = locator.name(),
                        error = %e,
                        "Locator failed, continuing"
                    );
                }
                Err(_) => {
                    warn!(
                        intent_id = %intent.id(),
                        locator = locator.name(),
                        "Locator panicked, continuing"
                    );
                }
            }
        }

        match Url::parse(intent.uri()) {
            Ok(url) => {
                debug!(intent_id = %intent.id(), %url, "Using URI as address");
                Ok(Address::identity(url))
            }
            Err(_) => Err(LocateError::Unresolvable(intent.uri().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::AddressOrigin;

    struct Fixed {
        name: &'static str,
        target: &'static str,
    }

    impl Locator for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn locate(&self, _intent: &Intent) -> Result<Option<Url>, LocateError> {
            Ok(Some(Url::parse(self.target).unwrap()))
        }
    }

    struct Broken;

    impl Locator for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn locate(&self, _intent: &Intent) -> Result<Option<Url>, LocateError> {
            Err(LocateError::Failed("backend down".to_string()))
        }
    }

    struct Panicky;

    impl Locator for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn locate(&self, _intent: &Intent) -> Result<Option<Url>, LocateError> {
            panic!("locator bug")
        }
    }

    #[test]
    fn test_identity_fallback_without_locators() {
        let chain = LocatorChain::new();
        let address = chain
            .locate(&Intent::for_uri("https://example.org/a.kml"))
            .unwrap();

        assert!(address.is_identity());
        assert_eq!(address.url().as_str(), "https://example.org/a.kml");
    }

    #[test]
    fn test_unparseable_uri_is_unresolvable() {
        let chain = LocatorChain::new();
        let result = chain.locate(&Intent::for_uri("just some words"));
        assert!(matches!(result, Err(LocateError::Unresolvable(_))));
    }

    #[test]
    fn test_relative_reference_needs_a_locator() {
        let chain = LocatorChain::new();
        chain.register(0, Arc::new(FilePathLocator::default()));

        let intent = Intent::for_uri("layers/rivers.kml");
        assert!(matches!(
            chain.locate(&intent),
            Err(LocateError::Unresolvable(uri)) if uri == "layers/rivers.kml"
        ));

        chain.register(
            0,
            Arc::new(PrefixLocator::new(
                "layers",
                "layers/",
                "https://maps.example.org/layers/",
            )),
        );
        let address = chain.locate(&intent).unwrap();
        assert!(!address.is_identity());
        assert_eq!(
            address.url().as_str(),
            "https://maps.example.org/layers/rivers.kml"
        );
    }

    #[test]
    fn test_higher_priority_wins() {
        let chain = LocatorChain::new();
        chain.register(
            0,
            Arc::new(Fixed {
                name: "low",
                target: "https://low.example.org/",
            }),
        );
        chain.register(
            5,
            Arc::new(Fixed {
                name: "high",
                target: "https://high.example.org/",
            }),
        );

        let address = chain.locate(&Intent::for_uri("x:y")).unwrap();
        assert_eq!(address.origin(), &AddressOrigin::Locator("high".to_string()));
    }

    #[test]
    fn test_failing_locators_are_skipped() {
        let chain = LocatorChain::new();
        chain.register(10, Arc::new(Broken));
        chain.register(9, Arc::new(Panicky));
        chain.register(
            0,
            Arc::new(Fixed {
                name: "fallback",
                target: "https://ok.example.org/",
            }),
        );

        let address = chain.locate(&Intent::for_uri("x:y")).unwrap();
        assert_eq!(address.url().as_str(), "https://ok.example.org/");
    }

    #[test]
    fn test_unregister() {
        let chain = LocatorChain::new();
        let id = chain.register(
            0,
            Arc::new(Fixed {
                name: "only",
                target: "https://only.example.org/",
            }),
        );

        assert!(chain.unregister(id));
        assert!(chain.is_empty());
        let address = chain
            .locate(&Intent::for_uri("https://direct.example.org/"))
            .unwrap();
        assert!(address.is_identity());
    }

    #[test]
    fn test_from_config() {
        let chain = LocatorChain::from_config(&[LocatorConfig {
            name: "catalog".to_string(),
            kind: LocatorKind::Prefix,
            priority: 1,
            prefix: Some("catalog:".to_string()),
            replacement: Some("https://catalog.example.org/".to_string()),
        }]);

        let address = chain.locate(&Intent::for_uri("catalog:root.json")).unwrap();
        assert_eq!(
            address.url().as_str(),
            "https://catalog.example.org/root.json"
        );
    }
}
