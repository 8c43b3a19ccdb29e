//! Stage 2: write the captured bytes to the authorized URL.

use crate::capture::CapturedImage;
use crate::error::ScanError;
use crate::model::UploadAuthorization;
use crate::pipeline::reason_from_body;
use tracing::debug;

/// PUT the capture to the store through its time-limited authorization.
///
/// The `Content-Type` header must match the type the authorization was
/// issued for; the store rejects a mismatch, and an expired window fails
/// the same way. Both surface as [`ScanError::UploadRejected`] so the
/// orchestrator can retry from a fresh authorization.
pub async fn put_object(
    client: &reqwest::Client,
    auth: &UploadAuthorization,
    image: &CapturedImage,
) -> Result<(), ScanError> {
    let response = client
        .put(&auth.upload_url)
        .header(reqwest::header::CONTENT_TYPE, &image.content_type)
        .body(image.bytes.clone())
        .send()
        .await
        .map_err(|e| ScanError::UploadFailed {
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ScanError::UploadRejected {
            status: status.as_u16(),
            reason: reason_from_body(status.as_u16(), &text),
        });
    }

    debug!(
        "Stored {} bytes at key '{}'",
        image.bytes.len(),
        auth.key
    );
    Ok(())
}
