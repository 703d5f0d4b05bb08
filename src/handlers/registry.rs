use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::traits::HandlerFactory;
use super::{BytesFactory, CatalogFactory, LayerFactory, TextFactory};
use crate::intent::ResultType;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found: {0}")]
    NotFound(String),
}

/// Registry mapping handler names to factories
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: Arc<RwLock<BTreeMap<String, Arc<dyn HandlerFactory>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under its own name, replacing any previous one
    pub fn register(&self, factory: Arc<dyn HandlerFactory>) {
        let name = factory.name().to_string();
        tracing::debug!(handler = %name, produces = %factory.produces(), "Registering handler");
        self.factories.write().insert(name, factory);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories.write().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn HandlerFactory>, RegistryError> {
        self.factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    pub fn produces(&self, name: &str) -> Option<ResultType> {
        self.factories.read().get(name).map(|f| f.produces())
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    /// Create registry with the built-in handlers
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(TextFactory));
        registry.register(Arc::new(BytesFactory));
        registry.register(Arc::new(LayerFactory));
        registry.register(Arc::new(CatalogFactory));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["bytes", "catalog", "layer", "text"]);
        assert_eq!(registry.produces("layer"), Some(ResultType::Layer));
        assert_eq!(registry.produces("text"), Some(ResultType::Text));
        assert!(registry.produces("missing").is_none());
    }

    #[test]
    fn test_get_missing() {
        let registry = HandlerRegistry::new();
        assert!(matches!(
            registry.get("layer"),
            Err(RegistryError::NotFound(name)) if name == "layer"
        ));
    }

    #[test]
    fn test_register_is_shared_between_clones() {
        let registry = HandlerRegistry::new();
        let clone = registry.clone();
        clone.register(Arc::new(TextFactory));

        assert!(registry.has_handler("text"));
        assert!(registry.unregister("text"));
        assert!(!clone.has_handler("text"));
    }
}
