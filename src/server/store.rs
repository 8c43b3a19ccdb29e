//! Signed object store with expiry- and scope-checked writes.
//!
//! Issuing an authorization reserves nothing: the store hands out a URL
//! whose query string carries an expiry and a signature over everything
//! the authorization is scoped to (bucket, key, content type, expiry).
//! A write is accepted only while the window is open and only with the
//! exact declared content type; because the declared type participates in
//! the signature, a mismatched `Content-Type` rejects as a bad signature.
//! Within the window the URL is not consumed by use: repeated writes to
//! the same key overwrite, matching presigned-URL store semantics.
//!
//! The core never lists or deletes objects; the only read is the
//! extractor's fetch by key.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Why the store refused an authorized write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("upload authorization expired")]
    Expired,

    #[error("upload authorization rejected")]
    BadSignature,
}

/// A stored blob and the content type it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory blob store keyed by `(bucket, key)`.
pub struct MemoryStore {
    signing_secret: String,
    objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryStore {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Hex SHA-256 over the authorization scope and the store secret.
    pub fn sign(&self, bucket: &str, key: &str, content_type: &str, expires_at_ms: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_secret.as_bytes());
        for part in [bucket, key, content_type] {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }
        hasher.update([0u8]);
        hasher.update(expires_at_ms.to_be_bytes());
        hex::encode(hasher.finalize())
    }

    /// Build a pre-authorized PUT URL for `(bucket, key)` valid for
    /// `ttl_secs` from now.
    pub fn signed_put_url(
        &self,
        base_url: &str,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl_secs: i64,
    ) -> String {
        let expires_at_ms = Utc::now().timestamp_millis() + ttl_secs * 1000;
        let signature = self.sign(bucket, key, content_type, expires_at_ms);
        format!("{base_url}/store/{bucket}/{key}?expires={expires_at_ms}&signature={signature}")
    }

    /// Accept an authorized write.
    ///
    /// `content_type` is the type the client declares on the PUT; it must
    /// be the one the authorization was issued for.
    pub fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_at_ms: i64,
        signature: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        if Utc::now().timestamp_millis() > expires_at_ms {
            return Err(StoreError::Expired);
        }
        if self.sign(bucket, key, content_type, expires_at_ms) != signature {
            return Err(StoreError::BadSignature);
        }

        debug!("Stored {}/{} ({} bytes, {})", bucket, key, bytes.len(), content_type);
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    /// Read back a stored object; the extractor's access path.
    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}
