//! End-to-end tests: the client pipeline run against an in-process
//! backend service bound to an ephemeral port, with a fixture standing in
//! for the analysis engine.

use async_trait::async_trait;
use docsnap::server::{serve, AnalyzerError, DocumentAnalyzer};
use docsnap::{
    AppState, CapturedImage, ExtractionResult, MemoryStore, Orchestrator, Phase, PipelineConfig,
    ScanError, ServerConfig, StaticFrameSource,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BUCKET: &str = "paystub-images";
const SECRET: &str = "e2e-secret";

/// Analysis-engine stand-in that reads nothing but checks the object
/// actually landed in the store before answering.
struct FixtureAnalyzer {
    store: Arc<MemoryStore>,
    fail_next: AtomicBool,
    delay: Duration,
}

impl FixtureAnalyzer {
    fn new(store: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            fail_next: AtomicBool::new(false),
            delay: Duration::ZERO,
        })
    }

    fn delayed(store: Arc<MemoryStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            store,
            fail_next: AtomicBool::new(false),
            delay,
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for FixtureAnalyzer {
    async fn analyze(
        &self,
        bucket: &str,
        key: &str,
        queries: &[&str],
    ) -> Result<Vec<ExtractionResult>, AnalyzerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.store.get(bucket, key).is_none() {
            return Err(AnalyzerError::ObjectMissing {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AnalyzerError::Engine {
                message: "document too blurry".to_string(),
            });
        }
        assert_eq!(queries.len(), 2, "both queries travel on every request");

        // Raw engine output: query answers interleaved with line/word
        // detections the extract operation must filter out.
        Ok(vec![
            ExtractionResult {
                block_type: docsnap::BlockType::Line,
                id: "l1".to_string(),
                text: Some("ACME Corp Payroll".to_string()),
                confidence: 99.1,
                geometry: None,
            },
            ExtractionResult::query_result("q1", "1,234,000", 98.2),
            ExtractionResult {
                block_type: docsnap::BlockType::Word,
                id: "w1".to_string(),
                text: Some("Pay".to_string()),
                confidence: 97.0,
                geometry: None,
            },
            ExtractionResult::query_result("q2", "987,000", 95.0),
        ])
    }
}

struct Backend {
    base_url: String,
    store: Arc<MemoryStore>,
}

/// Bind an ephemeral port, wire the analyzer into the service, and serve
/// in the background. The listener's real address becomes the public base
/// URL so signed upload URLs point back at this instance.
async fn start_backend(analyzer: Arc<dyn DocumentAnalyzer>, store: Arc<MemoryStore>) -> Backend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let config = ServerConfig::builder()
        .bucket(BUCKET)
        .public_base_url(&base_url)
        .signing_secret(SECRET)
        .build()
        .unwrap();
    let state = AppState {
        config: Arc::new(config),
        store: Arc::clone(&store),
        analyzer,
    };
    tokio::spawn(serve(listener, state));
    Backend { base_url, store }
}

async fn start_fixture_backend() -> Backend {
    let store = Arc::new(MemoryStore::new(SECRET));
    let analyzer = FixtureAnalyzer::new(Arc::clone(&store));
    start_backend(analyzer, store).await
}

fn client_config(base_url: &str) -> PipelineConfig {
    PipelineConfig::builder()
        .authorize_url(format!("{base_url}/authorize"))
        .extract_url(format!("{base_url}/extract"))
        .bucket(BUCKET)
        .build()
        .unwrap()
}

fn frame() -> CapturedImage {
    CapturedImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10], "image/jpeg")
}

// ── Full pipeline ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn full_pipeline_produces_a_review_sheet() {
    let backend = start_fixture_backend().await;
    let orch = Orchestrator::new(client_config(&backend.base_url)).unwrap();

    let source = StaticFrameSource::new(frame());
    assert!(orch.capture_from(&source));

    let sheet = orch.upload_and_analyze().await.unwrap().unwrap();
    assert_eq!(orch.phase(), Phase::Reviewing);

    // Line/word noise never reaches the review rows.
    let rows = sheet.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].value, "1,234,000");
    assert_eq!(rows[0].confidence, "98.2%");
    assert_eq!(rows[1].value, "987,000");
    assert_eq!(rows[1].confidence, "95.0%");

    // The snapshot is dropped once the upload served its purpose.
    assert!(!orch.has_image());
    assert!(orch
        .results()
        .iter()
        .all(|r| r.block_type == docsnap::BlockType::QueryResult));
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_failure_preserves_image_and_retry_succeeds() {
    let store = Arc::new(MemoryStore::new(SECRET));
    let analyzer = FixtureAnalyzer::new(Arc::clone(&store));
    analyzer.fail_next.store(true, Ordering::SeqCst);
    let backend = start_backend(analyzer, store).await;

    let orch = Orchestrator::new(client_config(&backend.base_url)).unwrap();
    orch.capture_from(&StaticFrameSource::new(frame()));

    let err = orch.upload_and_analyze().await.unwrap_err();
    match err {
        ScanError::ExtractFailed { status, reason } => {
            assert_eq!(status, Some(500));
            assert!(reason.contains("Failed to process document"), "got: {reason}");
            assert!(reason.contains("document too blurry"), "got: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(orch.phase(), Phase::Errored { .. }));
    // The capture survives the failure so the retry needs no camera.
    assert!(orch.has_image());

    let sheet = orch.upload_and_analyze().await.unwrap().unwrap();
    assert_eq!(sheet.rows()[0].value, "1,234,000");
    assert_eq!(orch.phase(), Phase::Reviewing);
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_during_flight_drops_the_late_response() {
    let store = Arc::new(MemoryStore::new(SECRET));
    let analyzer = FixtureAnalyzer::delayed(Arc::clone(&store), Duration::from_millis(800));
    let backend = start_backend(analyzer, store).await;

    let orch = Orchestrator::new(client_config(&backend.base_url)).unwrap();
    orch.capture_from(&StaticFrameSource::new(frame()));

    let in_flight = {
        let handle = orch.clone();
        tokio::spawn(async move { handle.upload_and_analyze().await })
    };

    // Let the attempt reach the analysis delay, then give up on it.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(orch.phase(), Phase::Analyzing);
    orch.reset();
    assert_eq!(orch.phase(), Phase::Idle);

    // The late response settles as a silent no-op, not a review.
    let outcome = in_flight.await.unwrap().unwrap();
    assert!(outcome.is_none());
    assert_eq!(orch.phase(), Phase::Idle);
    assert!(orch.results().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn in_flight_attempt_blocks_retake_and_reupload() {
    let store = Arc::new(MemoryStore::new(SECRET));
    let analyzer = FixtureAnalyzer::delayed(Arc::clone(&store), Duration::from_millis(500));
    let backend = start_backend(analyzer, store).await;

    let orch = Orchestrator::new(client_config(&backend.base_url)).unwrap();
    orch.capture_from(&StaticFrameSource::new(frame()));

    let in_flight = {
        let handle = orch.clone();
        tokio::spawn(async move { handle.upload_and_analyze().await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!orch.retake());
    assert!(orch.upload_and_analyze().await.unwrap().is_none());

    let sheet = in_flight.await.unwrap().unwrap();
    assert!(sheet.is_some());
    assert_eq!(orch.phase(), Phase::Reviewing);
}

// ── Operation contracts over raw HTTP ────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn authorize_rejects_missing_fields_with_contract_message() {
    let backend = start_fixture_backend().await;
    let client = reqwest::Client::new();
    let url = format!("{}/authorize", backend.base_url);

    for body in [
        serde_json::json!({}),
        serde_json::json!({ "fileName": "capture-1.jpg" }),
        serde_json::json!({ "fileName": "", "fileType": "image/jpeg" }),
    ] {
        let resp = client.post(&url).json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 400);
        let parsed: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(parsed["error"], "fileName and fileType are required");
        assert!(parsed.get("uploadUrl").is_none());
        assert!(parsed.get("key").is_none());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn authorize_reports_an_unusable_ttl_as_internal_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let store = Arc::new(MemoryStore::new(SECRET));
    let config = ServerConfig::builder()
        .bucket(BUCKET)
        .public_base_url(&base_url)
        .signing_secret(SECRET)
        .upload_ttl_secs(0)
        .build()
        .unwrap();
    let state = AppState {
        config: Arc::new(config),
        store: Arc::clone(&store),
        analyzer: FixtureAnalyzer::new(store),
    };
    tokio::spawn(serve(listener, state));

    let resp = reqwest::Client::new()
        .post(format!("{base_url}/authorize"))
        .json(&serde_json::json!({ "fileName": "a.jpg", "fileType": "image/jpeg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(parsed["error"], "Failed to construct upload authorization");
    assert!(parsed.get("uploadUrl").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn authorize_derives_a_timestamped_key() {
    let backend = start_fixture_backend().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/authorize", backend.base_url))
        .json(&serde_json::json!({ "fileName": "paystub.jpg", "fileType": "image/jpeg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let auth: serde_json::Value = resp.json().await.unwrap();
    let key = auth["key"].as_str().unwrap();
    let millis = key
        .strip_prefix("uploads/")
        .and_then(|rest| rest.strip_suffix("-paystub.jpg"))
        .unwrap();
    assert!(millis.parse::<i64>().is_ok(), "key was: {key}");

    let upload_url = auth["uploadUrl"].as_str().unwrap();
    assert!(upload_url.starts_with(&format!("{}/store/{BUCKET}/uploads/", backend.base_url)));
    assert!(upload_url.contains("expires="));
    assert!(upload_url.contains("signature="));
}

#[tokio::test(flavor = "multi_thread")]
async fn store_rejects_a_content_type_the_authorization_did_not_cover() {
    let backend = start_fixture_backend().await;
    let client = reqwest::Client::new();

    let auth: serde_json::Value = client
        .post(format!("{}/authorize", backend.base_url))
        .json(&serde_json::json!({ "fileName": "a.jpg", "fileType": "image/jpeg" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let upload_url = auth["uploadUrl"].as_str().unwrap();

    let resp = client
        .put(upload_url)
        .header("Content-Type", "image/png")
        .body(vec![0u8; 16])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // The declared type never landed in the store.
    let key = auth["key"].as_str().unwrap();
    assert!(backend.store.get(BUCKET, key).is_none());

    // The authorized type is accepted.
    let resp = client
        .put(upload_url)
        .header("Content-Type", "image/jpeg")
        .body(vec![0u8; 16])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(backend.store.get(BUCKET, key).unwrap().bytes.len(), 16);
}

#[tokio::test(flavor = "multi_thread")]
async fn extract_validates_body_and_fields() {
    let backend = start_fixture_backend().await;
    let client = reqwest::Client::new();
    let url = format!("{}/extract", backend.base_url);

    // No parseable body at all.
    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(parsed["error"], "Request body is required");

    // A body missing its fields.
    let resp = client
        .post(&url)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(parsed["error"], "key and bucket are required");
}

#[tokio::test(flavor = "multi_thread")]
async fn extract_reports_missing_objects_as_processing_failures() {
    let backend = start_fixture_backend().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/extract", backend.base_url))
        .json(&serde_json::json!({ "key": "uploads/0-missing.jpg", "bucket": BUCKET }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(parsed["error"], "Failed to process document");
    assert!(parsed["message"]
        .as_str()
        .unwrap()
        .contains("no stored object"));
}
