use axum::extract::Path;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::services::placeholder;

/// GET /api/static/{*path} — development placeholders for frame and face
/// images referenced by mock results.
pub async fn serve_static(Path(path): Path<String>) -> Response {
    if !placeholder::is_placeholder(&path) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Image not found" })),
        )
            .into_response();
    }

    (
        [
            (CONTENT_TYPE, "image/svg+xml"),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        placeholder::render_svg(&path),
    )
        .into_response()
}
