//! Capture surface: frame sources and the captured-image snapshot.
//!
//! ## Why a polling contract?
//!
//! A camera stream is not live the instant the surface mounts; the first
//! capture attempts return nothing until the hardware delivers frames.
//! Rather than letting callers consume an optional return ad hoc,
//! [`await_frame`] makes the readiness check an explicit polling contract
//! with a bounded wait, so "fire camera, wait for stream" reads as one
//! suspension point in the pipeline.

use crate::error::ScanError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// An in-memory still-image snapshot plus its source content type.
///
/// Created by a [`FrameSource`] on a capture event and exclusively owned
/// by the orchestrator until the upload starts; discarded on retake or
/// when the review closes.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    /// Encoded image bytes, ready for a binary PUT.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`, e.g. `image/jpeg`.
    pub content_type: String,
    /// Capture instant in epoch milliseconds; used to name the upload.
    pub captured_at_ms: i64,
}

impl CapturedImage {
    /// Wrap already-encoded image bytes, stamping the capture instant.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            captured_at_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL, the form webcam
    /// surfaces emit for screenshots.
    pub fn from_data_url(data_url: &str) -> Result<Self, ScanError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| ScanError::InvalidCapture {
                detail: "not a data URL".to_string(),
            })?;
        let (mime, payload) =
            rest.split_once(";base64,")
                .ok_or_else(|| ScanError::InvalidCapture {
                    detail: "missing ';base64,' marker".to_string(),
                })?;
        if mime.is_empty() {
            return Err(ScanError::InvalidCapture {
                detail: "empty content type".to_string(),
            });
        }
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ScanError::InvalidCapture {
                detail: format!("invalid base64 payload: {e}"),
            })?;
        Ok(Self::new(bytes, mime))
    }

    /// Upload file name derived from the capture instant,
    /// `capture-{millis}.{ext}`.
    pub fn suggested_file_name(&self) -> String {
        let ext = match self.content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            other => other.rsplit('/').next().unwrap_or("bin"),
        };
        format!("capture-{}.{}", self.captured_at_ms, ext)
    }
}

/// Wraps a device camera (or a stand-in): produces a still frame on demand.
///
/// `capture` has no side effect beyond reading the live frame; what to do
/// with the snapshot is the caller's decision. No network or storage
/// access happens here.
pub trait FrameSource: Send + Sync {
    /// Whether the underlying stream is delivering frames yet.
    fn is_ready(&self) -> bool;

    /// Take a still frame, or `None` while the stream is not ready.
    fn capture(&self) -> Option<CapturedImage>;
}

/// Poll `source` until it yields a frame or `timeout` elapses.
///
/// This is the readiness contract the orchestrator uses before an attempt
/// starts: the bounded wait turns "camera not yet live" into a
/// [`ScanError::CaptureTimeout`] instead of a silent no-op.
pub async fn await_frame(
    source: &dyn FrameSource,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<CapturedImage, ScanError> {
    let started = tokio::time::Instant::now();
    loop {
        if let Some(frame) = source.capture() {
            debug!(
                "Frame ready after {}ms ({} bytes, {})",
                started.elapsed().as_millis(),
                frame.bytes.len(),
                frame.content_type
            );
            return Ok(frame);
        }
        if started.elapsed() >= timeout {
            return Err(ScanError::CaptureTimeout {
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        sleep(poll_interval).await;
    }
}

/// A frame source backed by an image file, for CLI and headless use.
///
/// The file is decoded once at construction and re-encoded as JPEG, the
/// same format the webcam surface produces, so downstream content-type
/// handling is identical for both sources.
pub struct FileFrameSource {
    frame: CapturedImage,
}

impl FileFrameSource {
    /// Load and re-encode `path`. Fails if the file is missing or is not
    /// a decodable image.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| ScanError::InvalidCapture {
            detail: format!("cannot decode '{}': {e}", path.display()),
        })?;

        let mut buf = Vec::new();
        // JPEG has no alpha channel; flatten first.
        img.to_rgb8()
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .map_err(|e| ScanError::InvalidCapture {
                detail: format!("JPEG encoding failed: {e}"),
            })?;

        debug!(
            "Loaded frame from '{}': {} bytes as image/jpeg",
            path.display(),
            buf.len()
        );
        Ok(Self {
            frame: CapturedImage::new(buf, "image/jpeg"),
        })
    }
}

impl FrameSource for FileFrameSource {
    fn is_ready(&self) -> bool {
        true
    }

    fn capture(&self) -> Option<CapturedImage> {
        Some(self.frame.clone())
    }
}

/// A fixed frame behind a settable readiness flag.
///
/// Useful in tests to exercise the not-yet-ready path of the capture
/// contract without real hardware.
pub struct StaticFrameSource {
    frame: CapturedImage,
    ready: AtomicBool,
}

impl StaticFrameSource {
    /// Create a source that serves `frame`, ready immediately.
    pub fn new(frame: CapturedImage) -> Self {
        Self {
            frame,
            ready: AtomicBool::new(true),
        }
    }

    /// Create a source that reports not-ready until [`set_ready`] is
    /// called.
    ///
    /// [`set_ready`]: StaticFrameSource::set_ready
    pub fn not_ready(frame: CapturedImage) -> Self {
        Self {
            frame,
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl FrameSource for StaticFrameSource {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn capture(&self) -> Option<CapturedImage> {
        if self.is_ready() {
            Some(self.frame.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn jpeg_fixture() -> CapturedImage {
        let img = image::DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .unwrap();
        CapturedImage::new(buf, "image/jpeg")
    }

    #[test]
    fn data_url_round_trip() {
        let payload = STANDARD.encode(b"fake-jpeg-bytes");
        let url = format!("data:image/jpeg;base64,{payload}");
        let frame = CapturedImage::from_data_url(&url).unwrap();
        assert_eq!(frame.content_type, "image/jpeg");
        assert_eq!(frame.bytes, b"fake-jpeg-bytes");
    }

    #[test]
    fn data_url_rejects_plain_strings() {
        assert!(CapturedImage::from_data_url("not-a-data-url").is_err());
        assert!(CapturedImage::from_data_url("data:image/jpeg,no-marker").is_err());
    }

    #[test]
    fn suggested_file_name_uses_capture_instant() {
        let mut frame = jpeg_fixture();
        frame.captured_at_ms = 1_700_000_000_000;
        assert_eq!(frame.suggested_file_name(), "capture-1700000000000.jpg");

        frame.content_type = "image/png".to_string();
        assert_eq!(frame.suggested_file_name(), "capture-1700000000000.png");
    }

    #[tokio::test]
    async fn await_frame_times_out_when_never_ready() {
        let source = StaticFrameSource::not_ready(jpeg_fixture());
        let err = await_frame(
            &source,
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScanError::CaptureTimeout { .. }));
    }

    #[tokio::test]
    async fn await_frame_picks_up_late_readiness() {
        let source = std::sync::Arc::new(StaticFrameSource::not_ready(jpeg_fixture()));
        let flip = std::sync::Arc::clone(&source);
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            flip.set_ready(true);
        });
        let frame = await_frame(
            source.as_ref(),
            Duration::from_millis(500),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert_eq!(frame.content_type, "image/jpeg");
    }

    #[test]
    fn file_frame_source_reencodes_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.png");
        let img = image::DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([10, 20, 30])));
        img.save(&path).unwrap();

        let source = FileFrameSource::open(&path).unwrap();
        assert!(source.is_ready());
        let frame = source.capture().unwrap();
        assert_eq!(frame.content_type, "image/jpeg");
        // JPEG magic bytes
        assert_eq!(&frame.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn file_frame_source_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.txt");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(FileFrameSource::open(&path).is_err());
    }
}
