use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::services::upstream::UpstreamError;

/// Hint attached when the inference backend cannot be reached.
pub const CONNECTIVITY_HINT: &str =
    "Make sure the inference backend is running and reachable from the gateway";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    MissingInput,
    InvalidInput,
    PayloadTooLarge,
    UpstreamFailure,
    ConnectivityFailure,
    InternalError,
}

/// JSON body of every failed gateway response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub detail: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hint: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Upstream processing failed ({status}): {detail}")]
    Upstream {
        status: StatusCode,
        detail: String,
        hint: Option<String>,
    },

    #[error("Cannot connect to inference backend: {0}")]
    Connectivity(String),

    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::MissingInput(_) => ErrorKind::MissingInput,
            GatewayError::InvalidInput(_) => ErrorKind::InvalidInput,
            GatewayError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            GatewayError::Upstream { .. } => ErrorKind::UpstreamFailure,
            GatewayError::Connectivity(_) => ErrorKind::ConnectivityFailure,
            GatewayError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingInput(_) | GatewayError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (detail, hint) = match self {
            GatewayError::Upstream { detail, hint, .. } => (detail.clone(), hint.clone()),
            GatewayError::Connectivity(_) => (
                "Cannot connect to inference backend".to_string(),
                Some(CONNECTIVITY_HINT.to_string()),
            ),
            other => (other.to_string(), None),
        };

        ErrorBody {
            detail,
            kind: self.kind().to_string(),
            hint,
        }
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unreachable(e) => GatewayError::Connectivity(e.to_string()),
            UpstreamError::Status {
                status,
                detail,
                hint,
            } => GatewayError::Upstream {
                status,
                detail,
                hint,
            },
            UpstreamError::Client(e) => GatewayError::Internal(e.to_string()),
            UpstreamError::InvalidBody(e) => GatewayError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                detail: format!("Backend returned an unreadable response: {e}"),
                hint: None,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let kind: &'static str = self.kind().into();
        metrics::counter!("prediction_failures_total", "kind" => kind).increment(1);
        (self.status(), Json(self.body())).into_response()
    }
}

/// Turn a panic inside a handler into a structured 500. The panic message is
/// logged, never returned.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "Request handler panicked");

    GatewayError::Internal("Internal server error".to_string()).into_response()
}
