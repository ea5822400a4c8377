use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};

use crate::models::detection::{DetectionResult, UpstreamPrediction};

/// Upstream error bodies are cut to this many characters.
const ERROR_SNIPPET_CHARS: usize = 100;

/// Client for the external inference backend.
pub struct UpstreamClient {
    http: Client,
    predict_url: Url,
}

impl UpstreamClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            http,
            predict_url: predict_url(base_url),
        })
    }

    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    /// Forward a multipart body untouched to `POST {backend}/api/predict/`.
    ///
    /// `content_type` must carry the original boundary parameter.
    pub async fn predict(
        &self,
        content_type: &str,
        body: Bytes,
    ) -> Result<DetectionResult, UpstreamError> {
        let response = self
            .http
            .post(self.predict_url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(UpstreamError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("application/json"));
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_failure(status, is_json, &text));
        }

        let prediction: UpstreamPrediction =
            response.json().await.map_err(UpstreamError::InvalidBody)?;

        Ok(prediction.normalize())
    }
}

fn predict_url(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    let path = format!("{}/api/predict/", base_url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Failed to build inference backend client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Inference backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Inference backend returned {status}: {detail}")]
    Status {
        status: StatusCode,
        detail: String,
        hint: Option<String>,
    },

    #[error("Failed to decode inference backend response: {0}")]
    InvalidBody(#[source] reqwest::Error),
}

impl UpstreamError {
    fn from_failure(status: StatusCode, is_json: bool, text: &str) -> Self {
        if is_json {
            let detail = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|body| {
                    ["detail", "error"]
                        .iter()
                        .find_map(|key| body.get(*key).and_then(|v| v.as_str()).map(str::to_owned))
                })
                .unwrap_or_else(|| "Backend processing failed".to_string());

            return UpstreamError::Status {
                status,
                detail,
                hint: None,
            };
        }

        let snippet: String = text.chars().take(ERROR_SNIPPET_CHARS).collect();
        UpstreamError::Status {
            status,
            detail: format!("Backend error: {snippet}"),
            hint: Some("Make sure the inference backend server is running".to_string()),
        }
    }
}
