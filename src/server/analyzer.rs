//! The document-analysis seam.
//!
//! The extract operation does not care which engine answers its queries;
//! it talks to a [`DocumentAnalyzer`] trait object. The shipped
//! implementation, [`HttpAnalyzer`], forwards to a remote analysis engine
//! over HTTP; tests plug in fixtures.

use crate::model::ExtractionResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Failures of the underlying analysis engine.
///
/// All variants are caught by the extract handler and reported as a
/// structured 500; no partial results survive a failure.
#[derive(Debug, Clone, Error)]
pub enum AnalyzerError {
    /// The engine could not be reached at all.
    #[error("analysis engine unreachable: {reason}")]
    Unreachable { reason: String },

    /// The engine answered with a failure (malformed document, quota,
    /// internal error).
    #[error("{message}")]
    Engine { message: String },

    /// The object named by `(bucket, key)` does not exist in the store.
    #[error("no stored object at {bucket}/{key}")]
    ObjectMissing { bucket: String, key: String },
}

/// Runs natural-language queries against a stored document.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze the object at `(bucket, key)` with the given ordered
    /// queries and return the raw block list the engine emitted.
    ///
    /// The engine does not guarantee that answers come back in query
    /// submission order; callers must not rely on it (the deployed wire
    /// contract does anyway, a documented fragility).
    async fn analyze(
        &self,
        bucket: &str,
        key: &str,
        queries: &[&str],
    ) -> Result<Vec<ExtractionResult>, AnalyzerError>;
}

#[derive(Debug, Serialize)]
struct EngineRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    queries: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(rename = "Blocks", default)]
    blocks: Vec<ExtractionResult>,
}

/// Client for a remote analysis engine.
///
/// Sends `{bucket, key, queries}` as JSON and expects a `{Blocks: [...]}`
/// response in the engine block shape. The engine reads the document from
/// the store itself; no bytes travel through this call.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyzer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        bucket: &str,
        key: &str,
        queries: &[&str],
    ) -> Result<Vec<ExtractionResult>, AnalyzerError> {
        debug!("Analyzing {}/{} with {} queries", bucket, key, queries.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EngineRequest { bucket, key, queries })
            .send()
            .await
            .map_err(|e| AnalyzerError::Unreachable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Engine {
                message: if text.is_empty() {
                    format!("engine returned HTTP {status}")
                } else {
                    text
                },
            });
        }

        let parsed: EngineResponse = response.json().await.map_err(|e| AnalyzerError::Engine {
            message: format!("malformed engine response: {e}"),
        })?;
        Ok(parsed.blocks)
    }
}
