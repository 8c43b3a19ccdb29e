//! Error types for the docsnap library.
//!
//! Two distinct error types reflect the two halves of the system:
//!
//! * [`ScanError`] — client side. Returned from the orchestrator and the
//!   pipeline stages when an attempt cannot proceed (camera never ready,
//!   authorization refused, store rejected the write, extraction failed).
//!   The orchestrator records the first message verbatim in its `Errored`
//!   phase so the user can retry without recapturing.
//!
//! * [`ApiError`] — backend operations. Every internal failure of the
//!   authorize and extract handlers is converted into a structured JSON
//!   body (`{error}` or `{error, message}`) rather than escaping as an
//!   unstructured failure; no retry happens server side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::model::ErrorBody;

/// All errors surfaced by the client-side pipeline.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    // ── Capture errors ────────────────────────────────────────────────────
    /// The camera stream never produced a frame within the polling window.
    #[error("Camera not ready after {waited_ms}ms\nCheck that the capture device is connected and try again.")]
    CaptureTimeout { waited_ms: u64 },

    /// An upload was requested with no captured image in hand.
    #[error("No captured image: capture a frame before uploading")]
    NoCapturedImage,

    /// The supplied capture payload could not be decoded.
    #[error("Invalid capture data: {detail}")]
    InvalidCapture { detail: String },

    // ── Upload errors ─────────────────────────────────────────────────────
    /// The authorize operation refused or could not be reached.
    #[error("Failed to obtain an upload authorization: {reason}")]
    AuthorizeFailed {
        status: Option<u16>,
        reason: String,
    },

    /// The object store rejected the authorized write (expired window,
    /// forged signature, or content-type mismatch).
    #[error("Upload rejected by the object store (HTTP {status}): {reason}")]
    UploadRejected { status: u16, reason: String },

    /// The write to the authorized URL failed before a response arrived.
    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The extract operation reported a failure or could not be reached.
    #[error("Field extraction failed: {reason}")]
    ExtractFailed {
        status: Option<u16>,
        reason: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures of the two backend operations, rendered as JSON error bodies.
///
/// The variants mirror the error taxonomy on the wire: client-caused input
/// problems are 400, store-side rejections of an authorized write are 403,
/// and everything internal is 500.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields; always client-caused.
    #[error("{0}")]
    Validation(String),

    /// The store refused the write: expired authorization, bad signature,
    /// or declared content type not matching the authorized one.
    #[error("{0}")]
    StoreRejected(String),

    /// The analysis engine failed; `message` carries the underlying cause.
    #[error("{error}: {message}")]
    Extraction { error: String, message: String },

    /// Server-side failure unrelated to the input.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::StoreRejected(_) => StatusCode::FORBIDDEN,
            ApiError::Extraction { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Extraction { error, message } => ErrorBody {
                error: error.clone(),
                message: Some(message.clone()),
            },
            other => ErrorBody {
                error: other.to_string(),
                message: None,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_rejected_display() {
        let e = ScanError::UploadRejected {
            status: 403,
            reason: "authorization expired".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("authorization expired"));
    }

    #[test]
    fn authorize_failed_display() {
        let e = ScanError::AuthorizeFailed {
            status: Some(400),
            reason: "fileName and fileType are required".into(),
        };
        assert!(e.to_string().contains("fileName and fileType"));
    }

    #[test]
    fn validation_maps_to_400() {
        let e = ApiError::Validation("key and bucket are required".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn extraction_maps_to_500_with_message() {
        let e = ApiError::Extraction {
            error: "Failed to process document".into(),
            message: "engine unreachable".into(),
        };
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().contains("engine unreachable"));
    }

    #[test]
    fn store_rejected_maps_to_403() {
        let e = ApiError::StoreRejected("upload authorization expired".into());
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
    }
}
