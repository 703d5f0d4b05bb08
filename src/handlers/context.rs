use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::debug;

use super::traits::{HandlerError, HandlerFactory, IntentHandler};
use crate::fetch::Fetcher;

type Service = Arc<dyn Any + Send + Sync>;

/// Shared construction facility for handlers.
///
/// Holds the fetch service, per-handler options and any application
/// services injected by type. Cloning shares all of it, including the
/// construction lock: only one handler is built at a time across every
/// clone, while the built handlers run concurrently.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    fetcher: Arc<Fetcher>,
    options: RwLock<HashMap<String, Value>>,
    services: RwLock<HashMap<TypeId, Service>>,
    construction: Mutex<()>,
}

impl ExecutionContext {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                fetcher,
                options: RwLock::new(HashMap::new()),
                services: RwLock::new(HashMap::new()),
                construction: Mutex::new(()),
            }),
        }
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.inner.fetcher
    }

    pub fn set_options(&self, handler: impl Into<String>, options: Value) {
        self.inner.options.write().insert(handler.into(), options);
    }

    /// Raw options for `handler`, `Null` when none were set
    pub fn options(&self, handler: &str) -> Value {
        self.inner
            .options
            .read()
            .get(handler)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Options for `handler` decoded into `T`; missing options give `T::default()`
    pub fn typed_options<T>(&self, handler: &str) -> Result<T, HandlerError>
    where
        T: DeserializeOwned + Default,
    {
        match self.options(handler) {
            Value::Null => Ok(T::default()),
            value => serde_json::from_value(value)
                .map_err(|e| HandlerError::InvalidOptions(format!("{handler}: {e}"))),
        }
    }

    /// Register a service handlers can look up by type, replacing any
    /// previous one of the same type
    pub fn provide<T: Send + Sync + 'static>(&self, service: T) {
        self.inner
            .services
            .write()
            .insert(TypeId::of::<T>(), Arc::new(service));
    }

    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let service = self.inner.services.read().get(&TypeId::of::<T>()).cloned()?;
        service.downcast::<T>().ok()
    }

    /// Build a handler under the construction lock.
    ///
    /// A factory that panics is reported as a construction failure.
    pub fn instantiate(
        &self,
        factory: &dyn HandlerFactory,
    ) -> Result<Box<dyn IntentHandler>, HandlerError> {
        let _guard = self.inner.construction.lock();
        debug!(handler = factory.name(), "Constructing handler");

        match catch_unwind(AssertUnwindSafe(|| factory.build(self))) {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::Construction(format!(
                "{} panicked: {}",
                factory.name(),
                panic_message(panic.as_ref())
            ))),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::handlers::HandlerInput;
    use crate::intent::{Payload, ResultType};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn context() -> ExecutionContext {
        ExecutionContext::new(Arc::new(Fetcher::new(&FetchConfig::default()).unwrap()))
    }

    struct Greeting(String);

    struct Echo(String);

    #[async_trait]
    impl IntentHandler for Echo {
        async fn handle(&self, _input: &HandlerInput) -> Result<Payload, HandlerError> {
            Ok(Payload::Text(self.0.clone()))
        }
    }

    struct GreetingFactory;

    impl HandlerFactory for GreetingFactory {
        fn name(&self) -> &str {
            "greeting"
        }

        fn produces(&self) -> ResultType {
            ResultType::Text
        }

        fn build(&self, ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
            let greeting = ctx
                .service::<Greeting>()
                .ok_or_else(|| HandlerError::Construction("no greeting".into()))?;
            Ok(Box::new(Echo(greeting.0.clone())))
        }
    }

    struct PanickingFactory;

    impl HandlerFactory for PanickingFactory {
        fn name(&self) -> &str {
            "panicking"
        }

        fn produces(&self) -> ResultType {
            ResultType::Any
        }

        fn build(&self, _ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
            panic!("injection exploded")
        }
    }

    #[test]
    fn test_service_injection() {
        let ctx = context();
        assert!(ctx.instantiate(&GreetingFactory).is_err());

        ctx.provide(Greeting("hello".into()));
        assert!(ctx.instantiate(&GreetingFactory).is_ok());
        assert_eq!(ctx.service::<Greeting>().unwrap().0, "hello");
        assert!(ctx.service::<String>().is_none());
    }

    #[test]
    fn test_construction_panic_is_an_error() {
        let ctx = context();
        let result = ctx.instantiate(&PanickingFactory);
        assert!(
            matches!(result, Err(HandlerError::Construction(msg)) if msg.contains("injection exploded"))
        );

        // the lock is usable afterwards
        ctx.provide(Greeting("again".into()));
        assert!(ctx.instantiate(&GreetingFactory).is_ok());
    }

    #[derive(Debug, Default, Deserialize)]
    struct Limits {
        #[serde(default)]
        max_items: usize,
    }

    #[test]
    fn test_typed_options() {
        let ctx = context();
        assert_eq!(ctx.typed_options::<Limits>("catalog").unwrap().max_items, 0);

        ctx.set_options("catalog", serde_json::json!({ "max_items": 5 }));
        assert_eq!(ctx.typed_options::<Limits>("catalog").unwrap().max_items, 5);

        ctx.set_options("catalog", serde_json::json!({ "max_items": "many" }));
        assert!(matches!(
            ctx.typed_options::<Limits>("catalog"),
            Err(HandlerError::InvalidOptions(_))
        ));
    }

    struct Slow {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl HandlerFactory for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn produces(&self) -> ResultType {
            ResultType::Text
        }

        fn build(&self, _ctx: &ExecutionContext) -> Result<Box<dyn IntentHandler>, HandlerError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Box::new(Echo("done".into())))
        }
    }

    #[test]
    fn test_construction_is_serialized_across_clones() {
        let ctx = context();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let ctx = ctx.clone();
                let factory = Slow {
                    active: active.clone(),
                    peak: peak.clone(),
                };
                std::thread::spawn(move || ctx.instantiate(&factory).is_ok())
            })
            .collect();

        for thread in threads {
            assert!(thread.join().unwrap());
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
