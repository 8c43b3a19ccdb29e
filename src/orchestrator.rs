//! The upload/analyze orchestrator: one attempt's state machine.
//!
//! Control flow is strictly linear per attempt: capture, then upload,
//! then extract, then review; retries restart from the upload (with a
//! fresh authorization), retakes restart from capture. The orchestrator
//! exclusively owns the per-attempt `CapturedImage` / authorization /
//! result-set triple; the review surface only ever receives projected
//! values.
//!
//! ## Stale responses
//!
//! A retake or reset taken while a network call is outstanding does not
//! abort the in-flight call; it only discards interest in the result.
//! Every attempt carries a monotonically increasing generation, bumped on
//! each attempt start and each return to `Idle`. After every suspension
//! point the orchestrator rechecks the generation and silently drops an
//! outcome whose attempt is no longer current, so a late response can
//! never overwrite state a newer attempt owns.

use crate::capture::{await_frame, CapturedImage, FrameSource};
use crate::config::PipelineConfig;
use crate::error::ScanError;
use crate::model::ExtractionResult;
use crate::pipeline::{authorize, extract, upload};
use crate::review::ReviewSheet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the current attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No capture yet; the camera view is live.
    Idle,
    /// A frame is held and can be retaken or uploaded.
    Captured,
    /// Authorize + PUT in flight. Retake and upload are disabled.
    Uploading,
    /// Extraction in flight. Retake and upload are disabled.
    Analyzing,
    /// Results arrived; the review surface is open.
    Reviewing,
    /// A network step failed. The image is preserved so the user can
    /// retry without recapturing.
    Errored { message: String },
}

struct Attempt {
    phase: Phase,
    generation: u64,
    image: Option<CapturedImage>,
    results: Vec<ExtractionResult>,
}

impl Attempt {
    fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.image = None;
        self.results.clear();
        self.generation += 1;
    }
}

/// Drives one capture → upload → extract → review attempt at a time.
///
/// Handles are cheap to clone and share the same attempt state, so a UI
/// task can issue `retake`/`reset` while `upload_and_analyze` is awaiting
/// a response on another handle.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Mutex<Attempt>>,
    client: reqwest::Client,
    config: Arc<PipelineConfig>,
}

impl Orchestrator {
    /// Create an orchestrator over a validated [`PipelineConfig`].
    pub fn new(config: PipelineConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScanError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Mutex::new(Attempt {
                phase: Phase::Idle,
                generation: 0,
                image: None,
                results: Vec::new(),
            })),
            client,
            config: Arc::new(config),
        })
    }

    // ── State queries ─────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.inner.lock().unwrap().phase.clone()
    }

    /// The message of the current `Errored` phase, if any.
    pub fn error_message(&self) -> Option<String> {
        match &self.inner.lock().unwrap().phase {
            Phase::Errored { message } => Some(message.clone()),
            _ => None,
        }
    }

    /// Whether a captured image is currently held.
    pub fn has_image(&self) -> bool {
        self.inner.lock().unwrap().image.is_some()
    }

    /// The raw result set of the current review, empty otherwise.
    pub fn results(&self) -> Vec<ExtractionResult> {
        self.inner.lock().unwrap().results.clone()
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.inner.lock().unwrap().generation
    }

    // ── User actions ──────────────────────────────────────────────────────

    /// Take a still frame from `source`.
    ///
    /// No-op (returns `false`) unless the orchestrator is `Idle` and the
    /// source has a frame ready.
    pub fn capture_from(&self, source: &dyn FrameSource) -> bool {
        let captured = {
            let mut a = self.inner.lock().unwrap();
            if a.phase != Phase::Idle {
                return false;
            }
            let Some(frame) = source.capture() else {
                debug!("Capture requested but the stream has no frame yet");
                return false;
            };
            let len = frame.bytes.len();
            a.image = Some(frame);
            a.phase = Phase::Captured;
            len
        };
        if let Some(obs) = &self.config.observer {
            obs.on_capture(captured);
            obs.on_phase_change(&Phase::Captured);
        }
        true
    }

    /// Like [`capture_from`], but wait for the stream to become ready
    /// first, polling at the configured interval.
    ///
    /// Fails with [`ScanError::CaptureTimeout`] when no frame arrives
    /// within the configured window; returns `Ok(false)` when the
    /// orchestrator left `Idle` while waiting.
    ///
    /// [`capture_from`]: Orchestrator::capture_from
    pub async fn capture_when_ready(&self, source: &dyn FrameSource) -> Result<bool, ScanError> {
        if self.phase() != Phase::Idle {
            return Ok(false);
        }
        let frame = await_frame(
            source,
            Duration::from_millis(self.config.capture_timeout_ms),
            Duration::from_millis(self.config.capture_poll_ms),
        )
        .await?;
        let len = frame.bytes.len();
        {
            let mut a = self.inner.lock().unwrap();
            if a.phase != Phase::Idle {
                return Ok(false);
            }
            a.image = Some(frame);
            a.phase = Phase::Captured;
        }
        if let Some(obs) = &self.config.observer {
            obs.on_capture(len);
            obs.on_phase_change(&Phase::Captured);
        }
        Ok(true)
    }

    /// Discard the held image and return to `Idle`.
    ///
    /// Disabled (returns `false`) while an upload or analysis is in
    /// flight; the guard is the interface, not advice.
    pub fn retake(&self) -> bool {
        {
            let mut a = self.inner.lock().unwrap();
            match a.phase {
                Phase::Captured | Phase::Errored { .. } => a.clear(),
                _ => return false,
            }
        }
        self.notify_phase(&Phase::Idle);
        true
    }

    /// Return to `Idle` from any state, discarding all per-attempt state.
    ///
    /// An in-flight network call is not aborted; its eventual response is
    /// recognised as stale and ignored.
    pub fn reset(&self) {
        self.inner.lock().unwrap().clear();
        self.notify_phase(&Phase::Idle);
    }

    /// Close the review surface, committed or not, and return to `Idle`.
    pub fn close_review(&self) -> bool {
        {
            let mut a = self.inner.lock().unwrap();
            if a.phase != Phase::Reviewing {
                return false;
            }
            a.clear();
        }
        self.notify_phase(&Phase::Idle);
        true
    }

    // ── The attempt ───────────────────────────────────────────────────────

    /// Run authorize → PUT → extract for the held image, strictly in
    /// order.
    ///
    /// Returns `Ok(Some(sheet))` when results arrived and the review
    /// opened, `Ok(None)` when the call was a guarded no-op (already
    /// uploading) or the attempt was superseded mid-flight, and `Err`
    /// when a step failed; the failure message is also recorded in the
    /// `Errored` phase with the image preserved for retry.
    pub async fn upload_and_analyze(&self) -> Result<Option<ReviewSheet>, ScanError> {
        let (generation, image) = {
            let mut a = self.inner.lock().unwrap();
            match a.phase {
                Phase::Uploading | Phase::Analyzing => {
                    debug!("Upload requested while an attempt is in flight; ignored");
                    return Ok(None);
                }
                Phase::Captured | Phase::Errored { .. } => {}
                Phase::Idle | Phase::Reviewing => return Err(ScanError::NoCapturedImage),
            }
            let image = a.image.clone().ok_or(ScanError::NoCapturedImage)?;
            a.generation += 1;
            a.phase = Phase::Uploading;
            (a.generation, image)
        };
        self.notify_phase(&Phase::Uploading);

        let file_name = image.suggested_file_name();
        info!("Attempt {generation}: uploading '{file_name}'");

        // Step 1: authorization naming the capture.
        let auth = match authorize::request_authorization(
            &self.client,
            &self.config,
            &file_name,
            &image.content_type,
        )
        .await
        {
            Ok(auth) => auth,
            Err(e) => return self.settle_failure(generation, e),
        };
        if !self.is_current(generation) {
            return Ok(self.drop_stale(generation));
        }

        // Step 2: the single authorized write.
        if let Err(e) = upload::put_object(&self.client, &auth, &image).await {
            return self.settle_failure(generation, e);
        }

        // Step 3: extraction against the stored key. The upload phase
        // proceeds here automatically; there is no suspension point for
        // the user in between.
        if !self.advance_to_analyzing(generation) {
            return Ok(None);
        }
        let results = match extract::run_extraction(&self.client, &self.config, &auth.key).await {
            Ok(results) => results,
            Err(e) => return self.settle_failure(generation, e),
        };

        Ok(self.settle_success(generation, results))
    }

    // ── Internal transitions (generation-checked) ─────────────────────────

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().unwrap().generation == generation
    }

    fn drop_stale(&self, generation: u64) -> Option<ReviewSheet> {
        warn!("Attempt {generation} superseded; dropping its response");
        if let Some(obs) = &self.config.observer {
            obs.on_stale_response(generation);
        }
        None
    }

    fn advance_to_analyzing(&self, generation: u64) -> bool {
        {
            let mut a = self.inner.lock().unwrap();
            if a.generation != generation || a.phase != Phase::Uploading {
                drop(a);
                self.drop_stale(generation);
                return false;
            }
            a.phase = Phase::Analyzing;
        }
        self.notify_phase(&Phase::Analyzing);
        true
    }

    fn settle_success(
        &self,
        generation: u64,
        results: Vec<ExtractionResult>,
    ) -> Option<ReviewSheet> {
        {
            let mut a = self.inner.lock().unwrap();
            if a.generation != generation {
                drop(a);
                return self.drop_stale(generation);
            }
            // The upload succeeded, so the snapshot has served its
            // purpose; a later retry recaptures.
            a.image = None;
            a.results = results.clone();
            a.phase = Phase::Reviewing;
        }
        self.notify_phase(&Phase::Reviewing);
        info!(
            "Attempt {generation}: {} query answers, review open",
            results.len()
        );
        Some(ReviewSheet::from_results(&results))
    }

    fn settle_failure(
        &self,
        generation: u64,
        error: ScanError,
    ) -> Result<Option<ReviewSheet>, ScanError> {
        let message = error.to_string();
        {
            let mut a = self.inner.lock().unwrap();
            if a.generation != generation {
                drop(a);
                self.drop_stale(generation);
                return Ok(None);
            }
            a.phase = Phase::Errored {
                message: message.clone(),
            };
        }
        warn!("Attempt {generation} failed: {message}");
        if let Some(obs) = &self.config.observer {
            obs.on_attempt_error(&message);
            obs.on_phase_change(&self.phase());
        }
        Err(error)
    }

    fn notify_phase(&self, phase: &Phase) {
        if let Some(obs) = &self.config.observer {
            obs.on_phase_change(phase);
        }
    }
}
