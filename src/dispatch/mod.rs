//! Routing produced payloads to the part of the application that consumes them
//!
//! Consumers register against a [`ResultType`]. A payload goes to the
//! consumer registered for the most specific tag in its lineage, so a
//! `Document` consumer receives layers and catalogs unless a `Layer` or
//! `Catalog` consumer is registered too.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::intent::{Intent, Payload, ResultType};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no consumer registered for {result_type} results (intent {uri})")]
    NoConsumer { result_type: ResultType, uri: String },

    #[error("consumer for {result_type} failed: {reason}")]
    ConsumerFailed {
        result_type: ResultType,
        reason: String,
    },
}

type Consumer<C> = Arc<dyn Fn(&Payload, &Intent, &C) -> Result<(), DispatchError> + Send + Sync>;

/// Type-tag keyed consumer registry, generic over the consumer context `C`
pub struct Dispatcher<C> {
    consumers: RwLock<HashMap<ResultType, Consumer<C>>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            consumers: RwLock::new(HashMap::new()),
        }
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `consumer` for `result_type`, replacing any previous one
    pub fn register_consumer<F>(&self, result_type: ResultType, consumer: F)
    where
        F: Fn(&Payload, &Intent, &C) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        debug!(%result_type, "Registering consumer");
        self.consumers.write().insert(result_type, Arc::new(consumer));
    }

    pub fn unregister_consumer(&self, result_type: &ResultType) -> bool {
        self.consumers.write().remove(result_type).is_some()
    }

    pub fn registered_types(&self) -> Vec<ResultType> {
        self.consumers.read().keys().cloned().collect()
    }

    /// Hand `payload` to the most specific matching consumer
    pub fn dispatch(&self, payload: &Payload, intent: &Intent, ctx: &C) -> Result<(), DispatchError> {
        let result_type = payload.result_type();

        let found = {
            let consumers = self.consumers.read();
            result_type
                .lineage()
                .into_iter()
                .find_map(|tag| consumers.get(&tag).map(|consumer| (tag, Arc::clone(consumer))))
        };

        let Some((tag, consumer)) = found else {
            return Err(DispatchError::NoConsumer {
                result_type,
                uri: intent.uri().to_string(),
            });
        };

        debug!(
            intent_id = %intent.id(),
            %result_type,
            consumer = %tag,
            "Dispatching result"
        );
        consumer(payload, intent, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Catalog, Layer};
    use std::sync::Mutex;

    type Log = Mutex<Vec<String>>;

    fn layer() -> Payload {
        Payload::Layer(Layer {
            name: "rivers".into(),
            kind: "kml".into(),
            source: "file:///rivers.kml".into(),
            content_type: None,
            properties: Default::default(),
        })
    }

    fn record(label: &'static str) -> impl Fn(&Payload, &Intent, &Log) -> Result<(), DispatchError> {
        move |payload: &Payload, _intent: &Intent, log: &Log| {
            log.lock()
                .unwrap()
                .push(format!("{label}:{}", payload.result_type()));
            Ok(())
        }
    }

    #[test]
    fn test_most_specific_consumer_wins() {
        let dispatcher = Dispatcher::<Log>::new();
        dispatcher.register_consumer(ResultType::Document, record("document"));
        dispatcher.register_consumer(ResultType::Layer, record("layer"));

        let log = Log::default();
        let intent = Intent::for_uri("file:///rivers.kml");
        dispatcher.dispatch(&layer(), &intent, &log).unwrap();

        let catalog = Payload::Catalog(Catalog {
            title: "t".into(),
            entries: vec![],
        });
        dispatcher.dispatch(&catalog, &intent, &log).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["layer:layer".to_string(), "document:catalog".to_string()]
        );
    }

    #[test]
    fn test_unregistered_type_is_an_error() {
        let dispatcher = Dispatcher::<Log>::new();
        dispatcher.register_consumer(ResultType::Layer, record("layer"));

        let log = Log::default();
        let result = dispatcher.dispatch(
            &Payload::Text("hello".into()),
            &Intent::for_uri("https://example.org/readme.txt"),
            &log,
        );

        assert!(matches!(
            result,
            Err(DispatchError::NoConsumer { result_type: ResultType::Text, .. })
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_any_consumer_catches_custom_results() {
        let dispatcher = Dispatcher::<Log>::new();
        dispatcher.register_consumer(ResultType::Any, record("any"));

        let log = Log::default();
        let payload = Payload::Custom {
            kind: "terrain".into(),
            value: serde_json::json!({ "levels": 12 }),
        };
        dispatcher
            .dispatch(&payload, &Intent::for_uri("x:1"), &log)
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["any:terrain".to_string()]);
    }

    #[test]
    fn test_unregister() {
        let dispatcher = Dispatcher::<Log>::new();
        dispatcher.register_consumer(ResultType::Layer, record("layer"));
        assert_eq!(dispatcher.registered_types(), vec![ResultType::Layer]);

        assert!(dispatcher.unregister_consumer(&ResultType::Layer));
        assert!(!dispatcher.unregister_consumer(&ResultType::Layer));
        assert!(dispatcher.registered_types().is_empty());
    }

    #[test]
    fn test_consumer_error_propagates() {
        let dispatcher = Dispatcher::<Log>::new();
        dispatcher.register_consumer(ResultType::Layer, |_, _, _: &Log| {
            Err(DispatchError::ConsumerFailed {
                result_type: ResultType::Layer,
                reason: "scene graph not ready".into(),
            })
        });

        let result = dispatcher.dispatch(&layer(), &Intent::for_uri("x:1"), &Log::default());
        assert!(matches!(result, Err(DispatchError::ConsumerFailed { .. })));
    }
}
