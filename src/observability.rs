//! Tracing setup and pipeline counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Calling it again is harmless; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Outcome counters for one pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    no_handler: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intent_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "submitted", "Metric incremented");
    }

    pub fn intent_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "completed", "Metric incremented");
    }

    pub fn intent_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "failed", "Metric incremented");
    }

    /// A failure that was specifically "no filter matched"; also counted as failed
    pub fn no_handler(&self) {
        self.no_handler.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "no_handler", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            no_handler: self.no_handler.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub no_handler: u64,
}

impl MetricsSnapshot {
    /// Submissions that have not reported an outcome yet
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.completed + self.failed)
    }
}
