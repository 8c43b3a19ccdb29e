//! Stage 1: request an upload authorization for the captured file.

use crate::config::PipelineConfig;
use crate::error::ScanError;
use crate::model::{AuthorizeRequest, UploadAuthorization};
use crate::pipeline::reason_from_body;
use tracing::debug;

/// `POST` the authorize operation and parse the `{uploadUrl, key}` pair.
///
/// Issuing the authorization reserves nothing; it is consumed exactly
/// once by the upload stage and then discarded. A refusal (400/500) or a
/// transport failure maps to [`ScanError::AuthorizeFailed`] carrying the
/// server's error message.
pub async fn request_authorization(
    client: &reqwest::Client,
    config: &PipelineConfig,
    file_name: &str,
    file_type: &str,
) -> Result<UploadAuthorization, ScanError> {
    let body = AuthorizeRequest {
        file_name: Some(file_name.to_string()),
        file_type: Some(file_type.to_string()),
    };

    let response = client
        .post(&config.authorize_url)
        .json(&body)
        .send()
        .await
        .map_err(|e| ScanError::AuthorizeFailed {
            status: None,
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ScanError::AuthorizeFailed {
            status: Some(status.as_u16()),
            reason: reason_from_body(status.as_u16(), &text),
        });
    }

    let auth: UploadAuthorization =
        response.json().await.map_err(|e| ScanError::AuthorizeFailed {
            status: Some(status.as_u16()),
            reason: format!("malformed authorization response: {e}"),
        })?;

    debug!("Authorized upload for key '{}'", auth.key);
    Ok(auth)
}
