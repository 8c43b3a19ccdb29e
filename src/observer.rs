//! Observer trait for pipeline state-change events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::config::PipelineConfigBuilder::observer`] to receive events as
//! an attempt moves through its phases.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a UI, a progress bar, or a log without the
//! library knowing how the host application communicates. The trait is
//! `Send + Sync` so an orchestrator handle can be shared across tasks.

use crate::orchestrator::Phase;
use std::sync::Arc;

/// Called by the orchestrator as an attempt progresses.
///
/// All methods have default no-op implementations so callers only
/// override what they care about.
pub trait PipelineObserver: Send + Sync {
    /// A frame was captured and the attempt holds an image.
    fn on_capture(&self, image_bytes: usize) {
        let _ = image_bytes;
    }

    /// The attempt moved to a new phase.
    fn on_phase_change(&self, phase: &Phase) {
        let _ = phase;
    }

    /// A network step failed; `message` is what the user will see.
    fn on_attempt_error(&self, message: &str) {
        let _ = message;
    }

    /// A response arrived for an attempt that is no longer current and
    /// was discarded without touching state.
    fn on_stale_response(&self, generation: u64) {
        let _ = generation;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias matching the type stored in
/// [`crate::config::PipelineConfig`].
pub type Observer = Arc<dyn PipelineObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        phases: AtomicUsize,
        errors: AtomicUsize,
        stale: AtomicUsize,
    }

    impl PipelineObserver for CountingObserver {
        fn on_phase_change(&self, _phase: &Phase) {
            self.phases.fetch_add(1, Ordering::SeqCst);
        }

        fn on_attempt_error(&self, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stale_response(&self, _generation: u64) {
            self.stale.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_capture(1024);
        obs.on_phase_change(&Phase::Idle);
        obs.on_attempt_error("boom");
        obs.on_stale_response(3);
    }

    #[test]
    fn counting_observer_receives_events() {
        let obs = CountingObserver {
            phases: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            stale: AtomicUsize::new(0),
        };
        obs.on_phase_change(&Phase::Uploading);
        obs.on_phase_change(&Phase::Analyzing);
        obs.on_attempt_error("upload rejected");
        obs.on_stale_response(7);
        assert_eq!(obs.phases.load(Ordering::SeqCst), 2);
        assert_eq!(obs.errors.load(Ordering::SeqCst), 1);
        assert_eq!(obs.stale.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let obs: Arc<dyn PipelineObserver> = Arc::new(NoopObserver);
        obs.on_phase_change(&Phase::Reviewing);
    }
}
