use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::error::IntentError;
use crate::intent::{Intent, Payload};
use crate::observability::PipelineMetrics;

/// Two-outcome completion contract for a submitted intent.
///
/// Both methods consume the callback, so at most one of them can ever run.
/// The pipeline guarantees that exactly one does, on whatever task finished
/// the intent.
pub trait IntentCallback: Send + 'static {
    fn completed(self: Box<Self>, result: Payload, intent: Intent);

    fn error(self: Box<Self>, error: IntentError, intent: Intent);
}

/// Callback built from two closures
pub struct FnCallback<S, E> {
    on_success: S,
    on_error: E,
}

impl<S, E> FnCallback<S, E>
where
    S: FnOnce(Payload, Intent) + Send + 'static,
    E: FnOnce(IntentError, Intent) + Send + 'static,
{
    pub fn new(on_success: S, on_error: E) -> Self {
        Self {
            on_success,
            on_error,
        }
    }
}

impl<S, E> IntentCallback for FnCallback<S, E>
where
    S: FnOnce(Payload, Intent) + Send + 'static,
    E: FnOnce(IntentError, Intent) + Send + 'static,
{
    fn completed(self: Box<Self>, result: Payload, intent: Intent) {
        (self.on_success)(result, intent)
    }

    fn error(self: Box<Self>, error: IntentError, intent: Intent) {
        (self.on_error)(error, intent)
    }
}

/// Final state of one intent
#[derive(Debug)]
pub struct Completion {
    pub intent: Intent,
    pub result: Result<Payload, IntentError>,
}

/// Callback forwarding the outcome into a oneshot channel
pub struct ChannelCallback {
    tx: oneshot::Sender<Completion>,
}

impl ChannelCallback {
    pub fn channel() -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }
}

impl IntentCallback for ChannelCallback {
    fn completed(self: Box<Self>, result: Payload, intent: Intent) {
        // receiver gone means nobody is waiting anymore
        let _ = self.tx.send(Completion {
            intent,
            result: Ok(result),
        });
    }

    fn error(self: Box<Self>, error: IntentError, intent: Intent) {
        let _ = self.tx.send(Completion {
            intent,
            result: Err(error),
        });
    }
}

/// Owns the callback and the intent until the outcome is reported.
///
/// Dropping a guard that has not reported (the task was torn down, e.g. at
/// runtime shutdown) reports [`IntentError::Abandoned`].
pub(crate) struct CompletionGuard {
    callback: Option<Box<dyn IntentCallback>>,
    intent: Intent,
    finished: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
}

impl CompletionGuard {
    pub(crate) fn new(
        callback: Box<dyn IntentCallback>,
        intent: Intent,
        finished: Arc<AtomicBool>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            callback: Some(callback),
            intent,
            finished,
            metrics,
        }
    }

    pub(crate) fn intent(&self) -> &Intent {
        &self.intent
    }

    pub(crate) fn intent_mut(&mut self) -> &mut Intent {
        &mut self.intent
    }

    pub(crate) fn finish(mut self, outcome: Result<Payload, IntentError>) {
        let intent = self.intent.clone();
        self.report(outcome, intent);
    }

    fn report(&mut self, outcome: Result<Payload, IntentError>, intent: Intent) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        self.finished.store(true, Ordering::Release);

        match outcome {
            Ok(payload) => {
                self.metrics.intent_completed();
                info!(
                    intent_id = %intent.id(),
                    uri = intent.uri(),
                    result_type = %payload.result_type(),
                    "Intent completed"
                );
                callback.completed(payload, intent);
            }
            Err(error) => {
                self.metrics.intent_failed();
                if error.is_no_handler() {
                    self.metrics.no_handler();
                }
                warn!(
                    intent_id = %intent.id(),
                    uri = intent.uri(),
                    stage = %error.stage(),
                    error = %error,
                    "Intent failed"
                );
                callback.error(error, intent);
            }
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.callback.is_some() {
            let intent = self.intent.clone();
            self.report(
                Err(IntentError::Abandoned("task dropped before reporting".to_string())),
                intent,
            );
        }
    }
}
