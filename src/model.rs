//! Wire types shared by the client pipeline and the backend operations.
//!
//! Field casing is part of the deployed contract and is preserved
//! exactly: operation bodies use camelCase (`fileName`, `uploadUrl`),
//! analysis-engine blocks use PascalCase (`BlockType`, `Confidence`) with
//! SCREAMING_SNAKE_CASE block-type tags. The serde renames below are the
//! single place that mapping lives.

use serde::{Deserialize, Serialize};

// ── Authorize operation ──────────────────────────────────────────────────

/// Body of `POST /authorize`.
///
/// Both fields are required on the wire; they are optional here so the
/// handler can answer a missing field with the contract's 400 message
/// instead of a deserialization rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

/// Success body of `POST /authorize`: a time-limited signed PUT URL and the
/// storage key it writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthorization {
    pub upload_url: String,
    pub key: String,
}

// ── Extract operation ────────────────────────────────────────────────────

/// Body of `POST /extract`, naming the stored object to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub key: Option<String>,
    pub bucket: Option<String>,
}

// ── Analysis-engine blocks ───────────────────────────────────────────────

/// Category of an analysis block.
///
/// Only `QueryResult` survives the extract operation's filter; the other
/// variants exist so raw engine output parses losslessly. Tags the engine
/// may add later land in `Other` instead of failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    Query,
    QueryResult,
    #[serde(other)]
    Other,
}

/// Axis-aligned box in page-relative coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

/// One vertex of a detection polygon, page-relative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Where on the page a block was detected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub polygon: Vec<Point>,
}

/// One analysis block, in the engine's own shape.
///
/// For a `QueryResult` block, `text` is the matched answer and
/// `confidence` the engine's score on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractionResult {
    pub block_type: BlockType,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

impl ExtractionResult {
    /// Build a resolved query answer, the shape the extract operation
    /// returns. Fixtures and tests use this; geometry is omitted.
    pub fn query_result(id: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            block_type: BlockType::QueryResult,
            id: id.into(),
            text: Some(text.into()),
            confidence,
            geometry: None,
        }
    }
}

// ── Error body ───────────────────────────────────────────────────────────

/// JSON failure body of both operations: `{error}`, with `message` added
/// only for extraction failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
