use bon::bon;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::callback::{ChannelCallback, Completion, CompletionGuard, IntentCallback};
use super::error::IntentError;
use super::submission::{Submission, cancelled};
use crate::filters::FilterRegistry;
use crate::handlers::{
    ExecutionContext, HandlerError, HandlerFactory, HandlerInput, HandlerRegistry, panic_message,
};
use crate::intent::{Address, Intent, Payload};
use crate::locator::LocatorChain;
use crate::observability::{MetricsSnapshot, PipelineMetrics};
use crate::resolver::ResolverChain;

/// Entry point turning intents into typed results.
///
/// Cheap to clone; clones share the chains, the routing table and the
/// counters, so registrations made through one clone are seen by all.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

struct Inner {
    locators: LocatorChain,
    resolvers: ResolverChain,
    filters: FilterRegistry,
    handlers: HandlerRegistry,
    handler_timeout: Option<Duration>,
    metrics: Arc<PipelineMetrics>,
}

struct Selected {
    name: String,
    factory: Arc<dyn HandlerFactory>,
}

enum Route {
    Selected(Selected),
    /// Pick a filter once the content type has been resolved
    Deferred,
}

/// Aborts the wrapped task when dropped, so a cancelled or timed out
/// intent does not leave its handler running
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[bon]
impl Pipeline {
    /// `handler_timeout` bounds resolution plus handler execution per intent
    #[builder]
    pub fn new(
        #[builder(default)] locators: LocatorChain,
        #[builder(default)] resolvers: ResolverChain,
        #[builder(default)] filters: FilterRegistry,
        #[builder(default)] handlers: HandlerRegistry,
        handler_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                locators,
                resolvers,
                filters,
                handlers,
                handler_timeout,
                metrics: Arc::new(PipelineMetrics::new()),
            }),
        }
    }
}

impl Pipeline {
    pub fn locators(&self) -> &LocatorChain {
        &self.inner.locators
    }

    pub fn resolvers(&self) -> &ResolverChain {
        &self.inner.resolvers
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.inner.filters
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Submit `intent`; `callback` is invoked exactly once with the outcome.
    ///
    /// Locating the address and, when the content type is already known,
    /// choosing the handler happen before this returns; a failure there is
    /// reported through the callback before `submit` returns. Everything
    /// else runs on a spawned task of the current Tokio runtime.
    pub fn submit<C: IntentCallback>(
        &self,
        intent: Intent,
        callback: C,
        ctx: &ExecutionContext,
    ) -> Submission {
        self.submit_boxed(intent, Box::new(callback), ctx)
    }

    pub fn submit_boxed(
        &self,
        intent: Intent,
        callback: Box<dyn IntentCallback>,
        ctx: &ExecutionContext,
    ) -> Submission {
        self.inner.metrics.intent_submitted();
        debug!(intent_id = %intent.id(), uri = intent.uri(), "Intent submitted");

        let finished = Arc::new(AtomicBool::new(false));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let submission = Submission::new(intent.id(), finished.clone(), cancel_tx);
        let guard = CompletionGuard::new(callback, intent, finished, self.inner.metrics.clone());

        let address = match self.inner.locators.locate(guard.intent()) {
            Ok(address) => address,
            Err(source) => {
                let uri = guard.intent().uri().to_string();
                guard.finish(Err(IntentError::Unresolvable { uri, source }));
                return submission;
            }
        };

        let resolve_first = guard.intent().content_type().is_none()
            && self.inner.resolvers.supports_any(&address, guard.intent());

        let route = match self.route(guard.intent(), resolve_first) {
            Ok(route) => route,
            Err(error) => {
                guard.finish(Err(error));
                return submission;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            guard.finish(Err(IntentError::Abandoned(
                "submitted outside a Tokio runtime".to_string(),
            )));
            return submission;
        };

        let pipeline = self.clone();
        let ctx = ctx.clone();
        runtime.spawn(async move {
            pipeline
                .drive(guard, address, route, resolve_first, ctx, cancel_rx)
                .await;
        });

        submission
    }

    /// Submit and wait for the outcome
    pub async fn open(&self, intent: Intent, ctx: &ExecutionContext) -> Completion {
        let id = intent.id();
        let fallback = intent.clone();
        let (callback, rx) = ChannelCallback::channel();
        self.submit(intent, callback, ctx);

        match rx.await {
            Ok(completion) => completion,
            Err(_) => {
                warn!(intent_id = %id, "Callback dropped without reporting");
                Completion {
                    intent: fallback,
                    result: Err(IntentError::Abandoned("callback dropped".to_string())),
                }
            }
        }
    }

    fn route(&self, intent: &Intent, resolve_first: bool) -> Result<Route, IntentError> {
        if let Some(name) = intent.explicit_handler() {
            return self.explicit(name, intent).map(Route::Selected);
        }
        if resolve_first {
            return Ok(Route::Deferred);
        }
        self.select(intent).map(Route::Selected)
    }

    /// Honour the intent's explicit handler, bypassing the filters
    fn explicit(&self, name: &str, intent: &Intent) -> Result<Selected, IntentError> {
        let factory = self
            .inner
            .handlers
            .get(name)
            .map_err(|_| IntentError::UnknownHandler(name.to_string()))?;

        if let Some(required) = intent.required_return_type() {
            let produced = factory.produces();
            if !produced.may_produce(required) {
                return Err(IntentError::RequiredTypeMismatch {
                    handler: name.to_string(),
                    required: required.clone(),
                    produced,
                });
            }
        }

        debug!(intent_id = %intent.id(), handler = name, "Using explicit handler");
        Ok(Selected {
            name: name.to_string(),
            factory,
        })
    }

    fn select(&self, intent: &Intent) -> Result<Selected, IntentError> {
        let filter = self
            .inner
            .filters
            .find_filter(intent)
            .ok_or_else(|| IntentError::NoHandler {
                content_type: intent.content_type().cloned(),
                required: intent.required_return_type().cloned(),
            })?;

        let factory = self
            .inner
            .handlers
            .get(filter.handler())
            .map_err(|_| IntentError::UnknownHandler(filter.handler().to_string()))?;

        debug!(
            intent_id = %intent.id(),
            filter = filter.name(),
            handler = filter.handler(),
            "Filter selected"
        );
        Ok(Selected {
            name: filter.handler().to_string(),
            factory,
        })
    }

    async fn drive(
        self,
        mut guard: CompletionGuard,
        address: Address,
        route: Route,
        resolve_first: bool,
        ctx: ExecutionContext,
        cancel: watch::Receiver<bool>,
    ) {
        let outcome = {
            let work = self.execute(guard.intent_mut(), &address, route, resolve_first, &ctx);
            let bounded = async {
                match self.inner.handler_timeout {
                    Some(limit) => tokio::time::timeout(limit, work)
                        .await
                        .unwrap_or_else(|_| Err(IntentError::TimedOut(limit))),
                    None => work.await,
                }
            };

            tokio::select! {
                biased;
                _ = cancelled(cancel) => Err(IntentError::Cancelled),
                outcome = bounded => outcome,
            }
        };

        guard.finish(outcome);
    }

    async fn execute(
        &self,
        intent: &mut Intent,
        address: &Address,
        route: Route,
        resolve_first: bool,
        ctx: &ExecutionContext,
    ) -> Result<Payload, IntentError> {
        if resolve_first {
            self.resolve_content_type(intent, address).await;
        }

        let selected = match route {
            Route::Selected(selected) => selected,
            Route::Deferred => self.select(intent)?,
        };

        let handler = ctx
            .instantiate(selected.factory.as_ref())
            .map_err(|source| IntentError::HandlerFailed {
                handler: selected.name.clone(),
                source,
            })?;

        let input = HandlerInput {
            intent: intent.clone(),
            address: address.clone(),
        };
        debug!(
            intent_id = %intent.id(),
            handler = %selected.name,
            address = %address,
            "Running handler"
        );

        let mut task = AbortOnDrop(tokio::spawn(async move { handler.handle(&input).await }));
        let payload = match (&mut task.0).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(source)) => {
                return Err(IntentError::HandlerFailed {
                    handler: selected.name,
                    source,
                });
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    format!("panicked: {}", panic_message(join_error.into_panic().as_ref()))
                } else {
                    join_error.to_string()
                };
                return Err(IntentError::HandlerFailed {
                    handler: selected.name,
                    source: HandlerError::Fatal(reason),
                });
            }
        };

        if let Some(required) = intent.required_return_type() {
            let produced = payload.result_type();
            if !produced.is_assignable_to(required) {
                return Err(IntentError::RequiredTypeMismatch {
                    handler: selected.name,
                    required: required.clone(),
                    produced,
                });
            }
        }

        Ok(payload)
    }

    /// Fill in the intent's content type; failure leaves it unknown
    async fn resolve_content_type(&self, intent: &mut Intent, address: &Address) {
        match self.inner.resolvers.resolve(address, intent).await {
            Ok(Some(content_type)) => {
                intent.set_content_type(content_type);
            }
            Ok(None) => {
                debug!(intent_id = %intent.id(), %address, "Content type unknown");
            }
            Err(e) => {
                warn!(
                    intent_id = %intent.id(),
                    %address,
                    error = %e,
                    "Content type resolution failed, continuing without it"
                );
            }
        }
    }
}
