//! Progress reporting abstraction for the pipeline.
//!
//! Decouples the orchestrator from whatever shell is driving it. The task
//! manager supplies a real reporter; the CLI and tests use the no-op one.

use std::sync::Arc;

use async_trait::async_trait;

/// Reports pipeline progress as a 0-100 percentage with a short message.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Implementations should be fire-and-forget (never fail the caller).
    async fn report(&self, percent: u8, message: &str);
}

/// No-op reporter for the CLI and tests.
pub struct NoopProgressReporter;

#[async_trait]
impl ProgressReporter for NoopProgressReporter {
    async fn report(&self, _percent: u8, _message: &str) {}
}

/// Shorthand for creating a no-op reporter.
pub fn noop_progress() -> Arc<dyn ProgressReporter> {
    Arc::new(NoopProgressReporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReporter {
        count: AtomicUsize,
    }

    #[async_trait]
    impl ProgressReporter for CountingReporter {
        async fn report(&self, _percent: u8, _message: &str) {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test]
    async fn test_noop_reporter_does_nothing() {
        let reporter = NoopProgressReporter;
        reporter.report(50, "halfway").await;
    }

    #[tokio::test]
    async fn test_counting_reporter() {
        let reporter = CountingReporter {
            count: AtomicUsize::new(0),
        };
        reporter.report(0, "start").await;
        reporter.report(100, "done").await;
        assert_eq!(reporter.count.load(Ordering::Relaxed), 2);
    }
}
