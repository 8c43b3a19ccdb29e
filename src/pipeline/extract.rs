//! Stage 3: run the fixed query list against the stored object.

use crate::config::PipelineConfig;
use crate::error::ScanError;
use crate::model::{ExtractRequest, ExtractionResult};
use crate::pipeline::reason_from_body;
use tracing::debug;

/// `POST` the extract operation for `key` and parse the result array.
///
/// The response carries one entry per resolved query answer, in the order
/// the analysis engine emitted them. On failure the operation's
/// `{error, message}` body is folded into [`ScanError::ExtractFailed`];
/// no partial results are ever returned.
pub async fn run_extraction(
    client: &reqwest::Client,
    config: &PipelineConfig,
    key: &str,
) -> Result<Vec<ExtractionResult>, ScanError> {
    let body = ExtractRequest {
        key: Some(key.to_string()),
        bucket: Some(config.bucket.clone()),
    };

    let response = client
        .post(&config.extract_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| ScanError::ExtractFailed {
            status: None,
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ScanError::ExtractFailed {
            status: Some(status.as_u16()),
            reason: reason_from_body(status.as_u16(), &text),
        });
    }

    let results: Vec<ExtractionResult> =
        response.json().await.map_err(|e| ScanError::ExtractFailed {
            status: Some(status.as_u16()),
            reason: format!("malformed extraction response: {e}"),
        })?;

    debug!("Extraction returned {} query answers", results.len());
    Ok(results)
}
