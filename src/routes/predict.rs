use axum::body::{self, Body};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body_util::LengthLimitError;

use crate::app_state::AppState;
use crate::error::GatewayError;
use crate::models::upload::{SequenceLength, SEQUENCE_LENGTH_FIELD, VIDEO_FIELD};
use crate::routes::MAX_REQUEST_BYTES;
use crate::services::gateway::{PredictSubmission, UploadedVideo};

/// Response header naming where the result came from ("upstream" or "mock").
pub const PREDICTION_SOURCE_HEADER: &str = "x-prediction-source";

/// POST /api/predict — analyze an uploaded video.
pub async fn submit_prediction(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, GatewayError> {
    let submission = read_submission(request).await?;
    let outcome = state.gateway.handle_predict(submission).await?;

    Ok((
        [(PREDICTION_SOURCE_HEADER, outcome.source.to_string())],
        Json(outcome.result),
    )
        .into_response())
}

/// OPTIONS /api/predict — CORS preflight for cross-origin embedding.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

async fn read_submission(request: Request) -> Result<PredictSubmission, GatewayError> {
    read_submission_with_limit(request, MAX_REQUEST_BYTES).await
}

/// Buffer the raw multipart body and read the fields the gateway needs,
/// keeping the original bytes for forwarding.
async fn read_submission_with_limit(
    request: Request,
    limit: usize,
) -> Result<PredictSubmission, GatewayError> {
    let (parts, body) = request.into_parts();

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("multipart/form-data") {
        return Err(GatewayError::InvalidInput(
            "Expected a multipart/form-data request".to_string(),
        ));
    }

    let raw = body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            GatewayError::PayloadTooLarge { limit }
        } else {
            GatewayError::InvalidInput(format!("Failed to read request body: {e}"))
        }
    })?;

    let copy = Request::from_parts(parts, Body::from(raw.clone()));
    let mut multipart = Multipart::from_request(copy, &())
        .await
        .map_err(|e| GatewayError::InvalidInput(e.body_text()))?;

    let mut video = None;
    let mut sequence_length = SequenceLength::DEFAULT;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidInput(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(VIDEO_FIELD) => {
                let file_name = field.file_name().unwrap_or("video").to_string();
                let field_type = field.content_type().map(str::to_owned);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::InvalidInput(e.body_text()))?;

                // Browsers send an empty part when no file was chosen.
                if data.is_empty() {
                    continue;
                }

                video = Some(UploadedVideo {
                    file_name,
                    content_type: field_type,
                    size_bytes: data.len() as u64,
                });
            }
            Some(SEQUENCE_LENGTH_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| GatewayError::InvalidInput(e.body_text()))?;
                sequence_length = SequenceLength::parse(&text)
                    .map_err(|e| GatewayError::InvalidInput(e.to_string()))?;
            }
            _ => {}
        }
    }

    Ok(PredictSubmission {
        content_type,
        body: raw,
        video,
        sequence_length,
    })
}

/// Bodies without a Content-Length only hit the limit while streaming, and the
/// limit error may sit under a transport wrapper.
fn is_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}
