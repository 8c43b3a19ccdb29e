//! Handlers for the two backend operations and the store write.
//!
//! Both operations convert every internal failure into a JSON error body
//! (see [`crate::error::ApiError`]); the exact 400 messages of the
//! deployed contract are preserved.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use crate::error::ApiError;
use crate::model::{
    AuthorizeRequest, BlockType, ExtractRequest, ExtractionResult, UploadAuthorization,
};
use crate::queries::EXTRACTION_QUERIES;
use crate::server::store::StoreError;

/// `POST /authorize` — issue a time-limited write authorization.
///
/// Derives the storage key from the current instant and the requested
/// file name, scopes the signed URL to exactly that key and content type,
/// and returns `{uploadUrl, key}`. Nothing is reserved until the URL is
/// actually used.
pub async fn authorize(
    State(state): State<AppState>,
    body: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<Json<UploadAuthorization>, ApiError> {
    let Ok(Json(request)) = body else {
        return Err(ApiError::Validation(
            "fileName and fileType are required".to_string(),
        ));
    };
    let (Some(file_name), Some(file_type)) = (request.file_name, request.file_type) else {
        return Err(ApiError::Validation(
            "fileName and fileType are required".to_string(),
        ));
    };
    if file_name.is_empty() || file_type.is_empty() {
        return Err(ApiError::Validation(
            "fileName and fileType are required".to_string(),
        ));
    }

    // A non-positive window would mint authorizations born expired.
    if state.config.upload_ttl_secs <= 0 {
        warn!(
            "Refusing to authorize: upload TTL is {}s",
            state.config.upload_ttl_secs
        );
        return Err(ApiError::Internal(
            "Failed to construct upload authorization".to_string(),
        ));
    }

    let key = format!("uploads/{}-{}", Utc::now().timestamp_millis(), file_name);
    let upload_url = state.store.signed_put_url(
        &state.config.public_base_url,
        &state.config.bucket,
        &key,
        &file_type,
        state.config.upload_ttl_secs,
    );

    info!("Authorized upload of '{file_name}' as '{key}'");
    Ok(Json(UploadAuthorization { upload_url, key }))
}

#[derive(Debug, Deserialize)]
pub struct SignedPutParams {
    expires: i64,
    signature: String,
}

/// `PUT /store/{bucket}/{key}` — an authorized write.
pub async fn store_put(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(params): Query<SignedPutParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Validation("Content-Type header is required".to_string()))?
        .to_string();

    state
        .store
        .put(
            &bucket,
            &key,
            &content_type,
            params.expires,
            &params.signature,
            body.to_vec(),
        )
        .map_err(|e| {
            warn!("Rejected write to {bucket}/{key}: {e}");
            match e {
                StoreError::Expired => ApiError::StoreRejected(e.to_string()),
                StoreError::BadSignature => ApiError::StoreRejected(e.to_string()),
            }
        })?;

    Ok(StatusCode::OK)
}

/// `POST /extract` — run the fixed query list against a stored object.
///
/// The raw analysis output is filtered down to resolved query answers;
/// line/word-level detections never reach the client. Answers are
/// returned in the order the engine emitted them.
pub async fn extract(
    State(state): State<AppState>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<Vec<ExtractionResult>>, ApiError> {
    let Ok(Json(request)) = body else {
        return Err(ApiError::Validation("Request body is required".to_string()));
    };
    let (Some(key), Some(bucket)) = (request.key, request.bucket) else {
        return Err(ApiError::Validation(
            "key and bucket are required".to_string(),
        ));
    };
    if key.is_empty() || bucket.is_empty() {
        return Err(ApiError::Validation(
            "key and bucket are required".to_string(),
        ));
    }

    info!("Processing document {bucket}/{key}");

    let blocks = state
        .analyzer
        .analyze(&bucket, &key, EXTRACTION_QUERIES)
        .await
        .map_err(|e| {
            warn!("Extraction failed for {bucket}/{key}: {e}");
            ApiError::Extraction {
                error: "Failed to process document".to_string(),
                message: e.to_string(),
            }
        })?;

    let results: Vec<ExtractionResult> = blocks
        .into_iter()
        .filter(|b| b.block_type == BlockType::QueryResult)
        .collect();

    info!("Extraction of {bucket}/{key} produced {} answers", results.len());
    Ok(Json(results))
}
