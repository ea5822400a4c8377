use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// "upstream" when requests are forwarded, "mock" otherwise.
    pub mode: String,
    pub mock_fallback: bool,
}

/// GET /health — liveness plus the prediction mode in effect.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let gateway = &state.gateway;
    let mode = if gateway.forwards_upstream() {
        "upstream"
    } else {
        "mock"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: mode.to_string(),
        mock_fallback: gateway.config().mock_fallback,
    })
}
