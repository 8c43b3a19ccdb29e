//! Router configuration for the backend service.

use axum::http::{header, Method};
use axum::routing::{post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use super::{handlers, AppState};

/// Create the router exposing the two operations and the store write.
///
/// The CORS layer answers cross-origin preflights with
/// `Access-Control-Allow-Headers: Content-Type`, matching the deployed
/// contract; neither operation authenticates its callers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/authorize", post(handlers::authorize))
        .route("/extract", post(handlers::extract))
        .route("/store/:bucket/*key", put(handlers::store_put))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::PUT])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .with_state(state)
}
