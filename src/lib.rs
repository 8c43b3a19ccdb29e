//! # docsnap
//!
//! Photograph a paper document, upload it, run field-extraction queries
//! against it, and review/correct the values before committing them.
//!
//! ## Why this crate?
//!
//! Free-text OCR of a paystub gives you a wall of words; what the user
//! actually wants is two numbers and a chance to fix them. docsnap keeps
//! the extraction query-shaped end to end: the client captures a frame,
//! writes it to an object store through a time-limited authorization, asks
//! the analysis engine two fixed questions, and opens a review sheet
//! whose rows the user can edit before committing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Camera
//!  │
//!  ├─ 1. Capture    still frame from a FrameSource (polling readiness)
//!  ├─ 2. Authorize  POST /authorize → time-limited signed PUT URL + key
//!  ├─ 3. Upload     PUT the bytes with the declared content type
//!  ├─ 4. Extract    POST /extract → per-query answers with confidence
//!  └─ 5. Review     edit / commit / discard the projected rows
//! ```
//!
//! Steps 2-4 are strictly sequential network calls driven by the
//! [`Orchestrator`]; a retake or reset during flight discards interest in
//! the outcome rather than aborting it (attempt generations, see
//! [`orchestrator`]). The crate also ships the two backend operations as
//! an axum service ([`server`]) so the whole loop runs self-contained.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docsnap::{FileFrameSource, Orchestrator, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .authorize_url("http://127.0.0.1:8787/authorize")
//!         .extract_url("http://127.0.0.1:8787/extract")
//!         .bucket("paystub-images")
//!         .build()?;
//!
//!     let orchestrator = Orchestrator::new(config)?;
//!     let camera = FileFrameSource::open("paystub.jpg")?;
//!     orchestrator.capture_from(&camera);
//!
//!     if let Some(sheet) = orchestrator.upload_and_analyze().await? {
//!         for row in sheet.rows() {
//!             println!("{} ({})", row.value, row.confidence);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docsnap` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docsnap = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capture;
pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod orchestrator;
pub mod pipeline;
pub mod queries;
pub mod review;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capture::{await_frame, CapturedImage, FileFrameSource, FrameSource, StaticFrameSource};
pub use config::{PipelineConfig, PipelineConfigBuilder, ServerConfig, ServerConfigBuilder};
pub use error::{ApiError, ScanError};
pub use model::{BlockType, ExtractionResult, UploadAuthorization};
pub use observer::{NoopObserver, Observer, PipelineObserver};
pub use orchestrator::{Orchestrator, Phase};
pub use review::{CommitSink, LogSink, ReviewRow, ReviewSheet};
pub use server::{AppState, DocumentAnalyzer, HttpAnalyzer, MemoryStore};
