use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::intent::IntentId;

/// Acknowledgment returned by [`Pipeline::submit`].
///
/// Dropping it does not affect the intent.
///
/// [`Pipeline::submit`]: super::Pipeline::submit
#[derive(Debug, Clone)]
pub struct Submission {
    id: IntentId,
    finished: Arc<AtomicBool>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Submission {
    pub(crate) fn new(id: IntentId, finished: Arc<AtomicBool>, cancel: watch::Sender<bool>) -> Self {
        Self {
            id,
            finished,
            cancel: Arc::new(cancel),
        }
    }

    pub fn id(&self) -> IntentId {
        self.id
    }

    /// Whether the callback has already been invoked
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Ask the pipeline to stop working on the intent.
    ///
    /// If the outcome has not been reported yet, the callback receives
    /// [`IntentError::Cancelled`]. Cancelling a finished intent does nothing.
    ///
    /// [`IntentError::Cancelled`]: super::IntentError::Cancelled
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

/// Resolves once `cancel` is requested; never resolves if every
/// [`Submission`] handle is gone without cancelling
pub(crate) async fn cancelled(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}
