//! Configuration types for the pipeline and the backend service.
//!
//! All behaviour is controlled through two explicit structs, built via
//! their builders. Nothing is ambient: the endpoint URLs and the storage
//! container name that the reference deployment kept in module-level
//! globals are named fields here, injected into the orchestrator and the
//! server constructors.

use crate::error::ScanError;
use crate::observer::PipelineObserver;
use std::fmt;
use std::sync::Arc;

/// Configuration for the client-side capture → upload → extract pipeline.
///
/// Built via [`PipelineConfig::builder()`].
///
/// # Example
/// ```rust
/// use docsnap::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .authorize_url("https://api.example/authorize")
///     .extract_url("https://api.example/extract")
///     .bucket("paystub-images")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Endpoint of the upload-authorize operation (`POST`).
    pub authorize_url: String,

    /// Endpoint of the field-extract operation (`POST`).
    pub extract_url: String,

    /// Storage container the extract operation reads from. Passed verbatim
    /// in the extract request body; the client never touches the store by
    /// bucket itself, only through the pre-authorized URL.
    pub bucket: String,

    /// Content type declared for captures. Default: `image/jpeg`.
    ///
    /// Must match what the frame source actually encodes; the store
    /// rejects a PUT whose `Content-Type` differs from the authorized one.
    pub content_type: String,

    /// Per-request timeout for the three network-bound calls, in seconds.
    /// Default: 30.
    pub request_timeout_secs: u64,

    /// Polling interval while waiting for the camera stream, in
    /// milliseconds. Default: 150.
    pub capture_poll_ms: u64,

    /// Upper bound on waiting for the first live frame, in milliseconds.
    /// Default: 10 000.
    pub capture_timeout_ms: u64,

    /// Optional observer receiving phase-change and error events.
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            authorize_url: String::new(),
            extract_url: String::new(),
            bucket: String::new(),
            content_type: "image/jpeg".to_string(),
            request_timeout_secs: 30,
            capture_poll_ms: 150,
            capture_timeout_ms: 10_000,
            observer: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("authorize_url", &self.authorize_url)
            .field("extract_url", &self.extract_url)
            .field("bucket", &self.bucket)
            .field("content_type", &self.content_type)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("capture_poll_ms", &self.capture_poll_ms)
            .field("capture_timeout_ms", &self.capture_timeout_ms)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn PipelineObserver>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn authorize_url(mut self, url: impl Into<String>) -> Self {
        self.config.authorize_url = url.into();
        self
    }

    pub fn extract_url(mut self, url: impl Into<String>) -> Self {
        self.config.extract_url = url.into();
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    pub fn content_type(mut self, ct: impl Into<String>) -> Self {
        self.config.content_type = ct.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn capture_poll_ms(mut self, ms: u64) -> Self {
        self.config.capture_poll_ms = ms.max(10);
        self
    }

    pub fn capture_timeout_ms(mut self, ms: u64) -> Self {
        self.config.capture_timeout_ms = ms;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ScanError> {
        let c = &self.config;
        for (field, value) in [
            ("authorize_url", &c.authorize_url),
            ("extract_url", &c.extract_url),
            ("bucket", &c.bucket),
        ] {
            if value.is_empty() {
                return Err(ScanError::InvalidConfig(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Server configuration ─────────────────────────────────────────────────

/// Configuration for the backend service hosting the two operations and
/// the signed object store.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage container name objects are written under.
    pub bucket: String,

    /// Public base URL of this service, used when constructing signed
    /// upload URLs (e.g. `http://127.0.0.1:8787`). No trailing slash.
    pub public_base_url: String,

    /// Secret the store signs upload URLs with.
    pub signing_secret: String,

    /// Validity window of an issued upload authorization, in seconds.
    /// Default: 180. A write attempted after expiry must fail.
    pub upload_ttl_secs: i64,
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: ServerConfig {
                bucket: String::new(),
                public_base_url: String::new(),
                signing_secret: String::new(),
                upload_ttl_secs: 180,
            },
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.config.public_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.signing_secret = secret.into();
        self
    }

    pub fn upload_ttl_secs(mut self, secs: i64) -> Self {
        self.config.upload_ttl_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, ScanError> {
        let c = &self.config;
        for (field, value) in [
            ("bucket", &c.bucket),
            ("public_base_url", &c.public_base_url),
            ("signing_secret", &c.signing_secret),
        ] {
            if value.is_empty() {
                return Err(ScanError::InvalidConfig(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}
