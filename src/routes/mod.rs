pub mod health;
pub mod metrics;
pub mod placeholder;
pub mod predict;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::models::upload::MAX_VIDEO_BYTES;

/// Largest accepted request: the video ceiling plus room for multipart framing.
pub const MAX_REQUEST_BYTES: usize = MAX_VIDEO_BYTES as usize + 1024 * 1024;

/// Gateway routes with state applied, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/predict",
            post(predict::submit_prediction).options(predict::preflight),
        )
        .route("/api/static/{*path}", get(placeholder::serve_static))
        .with_state(state)
}

/// Panic recovery, tracing, compression, CORS and body limits shared by every
/// route.
pub fn with_layers(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    router
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(crate::error::panic_response))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Complete application as served.
pub fn app(state: AppState) -> Router {
    with_layers(router(state))
}
