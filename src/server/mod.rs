//! The backend service: upload authorization, field extraction, and the
//! signed object store, served over HTTP.
//!
//! The two operations are deliberately small: `authorize` derives a key
//! and signs a single-object write URL; `extract` forwards the fixed
//! query list to a [`DocumentAnalyzer`] and filters the answer blocks.
//! Everything an operation can fail with becomes a structured JSON error
//! body; no failure escapes unstructured.

pub mod analyzer;
pub mod handlers;
pub mod routes;
pub mod store;

pub use analyzer::{AnalyzerError, DocumentAnalyzer, HttpAnalyzer};
pub use store::{MemoryStore, StoreError, StoredObject};

use crate::config::ServerConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<MemoryStore>,
    pub analyzer: Arc<dyn DocumentAnalyzer>,
}

impl AppState {
    /// Build the state, creating the store from the config's secret.
    pub fn new(config: ServerConfig, analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        let store = Arc::new(MemoryStore::new(config.signing_secret.clone()));
        Self {
            config: Arc::new(config),
            store,
            analyzer,
        }
    }
}

/// Serve the backend operations on an already-bound listener.
///
/// Binding is the caller's job so the listener's actual address can feed
/// back into [`ServerConfig::public_base_url`] (tests bind port 0).
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!("Backend service listening on {addr}");
    axum::serve(listener, routes::create_router(state)).await
}
