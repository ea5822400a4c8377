//! Upload client for the prediction gateway.
//!
//! Mirrors the browser upload flow: select a video, pick a sequence length,
//! submit once, then either show the result or a diagnosable error until the
//! user resets.

pub mod preview;
pub mod progress;

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode, Url};
use tokio::sync::watch;

use crate::models::detection::DetectionResult;
use crate::models::upload::{
    SequenceLength, ValidationError, VideoFile, SEQUENCE_LENGTH_FIELD, VIDEO_FIELD,
};
use preview::ScopedPreview;
use progress::ProgressTracker;

/// Raw error bodies shown to the user are cut to this many characters.
const MAX_ERROR_CHARS: usize = 200;

const GENERIC_FAILURE: &str = "Processing failed";

#[derive(Debug, Clone, PartialEq)]
pub enum ClientState {
    Idle,
    FileSelected,
    Submitting,
    ResultReady(DetectionResult),
    Failed(ClientError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Please select a video file first")]
    MissingInput,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A submission is already in progress")]
    Busy,

    #[error("Reset before submitting another video")]
    ResultPending,

    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        hint: Option<String>,
    },

    #[error("{message}")]
    Connectivity { message: String, hint: String },

    #[error("Failed to read gateway response: {0}")]
    InvalidResponse(String),

    #[error("Failed to prepare local preview: {0}")]
    Preview(String),

    #[error("Invalid gateway URL {0}")]
    InvalidGatewayUrl(String),

    #[error("Submission was cancelled before the gateway responded")]
    Cancelled,
}

impl ClientError {
    /// Text for a user-facing notification, hint included.
    pub fn notification(&self) -> String {
        match self {
            ClientError::Server {
                message,
                hint: Some(hint),
                ..
            } => format!("{message}\n\n{hint}"),
            ClientError::Connectivity { message, hint } => format!("{message}\n\n{hint}"),
            other => other.to_string(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, ClientError::Connectivity { .. })
    }
}

struct Selection {
    video: VideoFile,
    preview: ScopedPreview,
}

pub struct UploadClient {
    http: Client,
    predict_url: Url,
    state: ClientState,
    selection: Option<Selection>,
    sequence_length: SequenceLength,
    progress: ProgressTracker,
}

impl UploadClient {
    /// `gateway_url` is the gateway's base address, e.g. `http://localhost:3000`.
    pub fn new(gateway_url: &str) -> Result<Self, ClientError> {
        let predict_url = Url::parse(gateway_url)
            .and_then(|base| base.join("api/predict"))
            .map_err(|e| ClientError::InvalidGatewayUrl(format!("{gateway_url:?}: {e}")))?;

        Ok(Self {
            http: Client::new(),
            predict_url,
            state: ClientState::Idle,
            selection: None,
            sequence_length: SequenceLength::DEFAULT,
            progress: ProgressTracker::new(),
        })
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn selected(&self) -> Option<&VideoFile> {
        self.selection.as_ref().map(|s| &s.video)
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.selection.as_ref().map(|s| s.preview.path())
    }

    pub fn sequence_length(&self) -> SequenceLength {
        self.sequence_length
    }

    pub fn set_sequence_length(&mut self, requested: i64) -> SequenceLength {
        self.sequence_length = SequenceLength::clamped(requested);
        self.sequence_length
    }

    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Accept `video` if it passes the size and type checks. On rejection the
    /// current selection and state are left untouched.
    pub async fn select_file(&mut self, video: VideoFile) -> Result<(), ClientError> {
        if self.state == ClientState::Submitting {
            return Err(ClientError::Busy);
        }

        if let Err(e) = video.check() {
            tracing::warn!(file_name = %video.file_name, error = %e, "Rejected video selection");
            return Err(e.into());
        }

        let preview = ScopedPreview::create(&video)
            .await
            .map_err(|e| ClientError::Preview(e.to_string()))?;
        tracing::debug!(file_name = %video.file_name, preview = %preview.path().display(), "Video selected");

        // Replacing the selection drops the previous preview file.
        self.selection = Some(Selection { video, preview });
        self.state = ClientState::FileSelected;
        Ok(())
    }

    /// Submit the selected video once. Errors are also kept in
    /// [`ClientState::Failed`] until the next selection, submission or reset.
    ///
    /// Dropping the returned future mid-flight leaves the client in
    /// `Failed(Cancelled)` with progress back at 0.
    pub async fn submit(&mut self) -> Result<DetectionResult, ClientError> {
        match self.state {
            ClientState::Submitting => return Err(ClientError::Busy),
            ClientState::ResultReady(_) => return Err(ClientError::ResultPending),
            _ => {}
        }

        let Some(selection) = &self.selection else {
            return Err(ClientError::MissingInput);
        };
        let form = build_form(&selection.video, self.sequence_length)?;

        self.state = ClientState::Submitting;
        self.progress.start();

        let guard = InFlight { client: self };
        let outcome = guard.client.send(form).await;
        guard.client.finish(outcome)
    }

    fn finish(
        &mut self,
        outcome: Result<DetectionResult, ClientError>,
    ) -> Result<DetectionResult, ClientError> {
        match outcome {
            Ok(result) => {
                self.progress.complete();
                self.state = ClientState::ResultReady(result.clone());
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Submission failed");
                self.progress.fail();
                self.state = ClientState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Back to the initial selection state; releases the preview file.
    pub fn reset(&mut self) {
        self.selection = None;
        self.state = ClientState::Idle;
        self.progress.fail();
    }

    async fn send(&self, form: Form) -> Result<DetectionResult, ClientError> {
        let response = self
            .http
            .post(self.predict_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Connectivity {
                message: format!("Cannot connect to the prediction gateway: {e}"),
                hint: format!(
                    "Make sure the gateway at {} and its inference backend are running",
                    self.predict_url.origin().ascii_serialization()
                ),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, hint) = describe_failure(status, &text);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
                hint,
            });
        }

        response
            .json::<DetectionResult>()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Held across the request so a dropped `submit` future does not leave the
/// client stuck in `Submitting` with the ticker running.
struct InFlight<'a> {
    client: &'a mut UploadClient,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.client.state == ClientState::Submitting {
            tracing::warn!("Submission cancelled");
            self.client.progress.fail();
            self.client.state = ClientState::Failed(ClientError::Cancelled);
        }
    }
}

fn build_form(video: &VideoFile, sequence_length: SequenceLength) -> Result<Form, ClientError> {
    let part = Part::stream_with_length(Body::from(video.bytes.clone()), video.size_bytes)
        .file_name(video.file_name.clone())
        .mime_str(&video.mime_type)
        .map_err(|e| ValidationError::Invalid(format!("mime type: {e}")))?;

    Ok(Form::new()
        .part(VIDEO_FIELD, part)
        .text(SEQUENCE_LENGTH_FIELD, sequence_length.to_string()))
}

/// Human-readable message (and optional hint) for a failed response.
pub fn describe_failure(status: StatusCode, body: &str) -> (String, Option<String>) {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let field = |key: &str| json.get(key).and_then(|v| v.as_str()).map(str::to_owned);
        let message = field("detail")
            .or_else(|| field("message"))
            .or_else(|| field("error"))
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        return (message, field("hint"));
    }

    let text = body.trim();
    if text.is_empty() {
        return (format!("Server error: {}", status.as_u16()), None);
    }
    (text.chars().take(MAX_ERROR_CHARS).collect(), None)
}
