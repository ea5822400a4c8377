use std::time::Instant;

use bytes::Bytes;
use strum::{Display, IntoStaticStr};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::detection::DetectionResult;
use crate::models::upload::SequenceLength;
use crate::services::mock::MockGenerator;
use crate::services::upstream::{UpstreamClient, UpstreamError};

/// Metadata about the uploaded video part.
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// A parsed prediction submission, together with the raw multipart body it
/// came from so it can be forwarded byte for byte.
#[derive(Debug, Clone)]
pub struct PredictSubmission {
    pub content_type: String,
    pub body: Bytes,
    pub video: Option<UploadedVideo>,
    pub sequence_length: SequenceLength,
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ResultSource {
    Upstream,
    Mock,
}

#[derive(Debug, Clone)]
pub struct PredictOutcome {
    pub result: DetectionResult,
    pub source: ResultSource,
}

/// Turns submissions into detection results: forward to the inference
/// backend when one is configured, otherwise (or when it is unreachable)
/// fabricate a mock result.
pub struct PredictionGateway {
    config: GatewayConfig,
    upstream: Option<UpstreamClient>,
    mock: MockGenerator,
}

impl PredictionGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let mock = MockGenerator::new(config.mock_delay);
        Self::with_mock(config, mock)
    }

    pub fn with_mock(config: GatewayConfig, mock: MockGenerator) -> Result<Self, UpstreamError> {
        let upstream = match config.effective_upstream() {
            Some(base) => Some(UpstreamClient::new(base, config.upstream_timeout)?),
            None => {
                if config.is_local_loopback() {
                    tracing::warn!(
                        upstream = ?config.upstream_base_url().map(|u| u.as_str()),
                        "Upstream is a loopback address, serving mock predictions"
                    );
                }
                None
            }
        };

        Ok(Self {
            config,
            upstream,
            mock,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn forwards_upstream(&self) -> bool {
        self.upstream.is_some()
    }

    pub async fn handle_predict(
        &self,
        submission: PredictSubmission,
    ) -> Result<PredictOutcome, GatewayError> {
        let start = Instant::now();

        let Some(video) = submission.video.as_ref() else {
            return Err(GatewayError::MissingInput(
                "No video file provided".to_string(),
            ));
        };

        tracing::info!(
            file_name = %video.file_name,
            size_bytes = video.size_bytes,
            sequence_length = submission.sequence_length.get(),
            "Prediction requested"
        );

        if let Some(upstream) = &self.upstream {
            match upstream
                .predict(&submission.content_type, submission.body.clone())
                .await
            {
                Ok(result) => {
                    tracing::info!(
                        verdict = %result.verdict,
                        confidence = result.confidence,
                        "Upstream prediction complete"
                    );
                    return Ok(self.finish(result, ResultSource::Upstream, start));
                }
                Err(UpstreamError::Unreachable(e)) if self.config.mock_fallback => {
                    tracing::warn!(
                        error = %e,
                        url = %upstream.predict_url(),
                        "Inference backend unreachable, falling back to mock prediction"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Upstream prediction failed");
                    return Err(e.into());
                }
            }
        }

        let result = self
            .mock
            .generate_delayed(submission.sequence_length, &video.file_name)
            .await;
        tracing::info!(
            verdict = %result.verdict,
            confidence = result.confidence,
            "Mock prediction generated"
        );

        Ok(self.finish(result, ResultSource::Mock, start))
    }

    fn finish(&self, result: DetectionResult, source: ResultSource, start: Instant) -> PredictOutcome {
        let label: &'static str = source.into();
        metrics::counter!("predictions_total", "source" => label).increment(1);
        metrics::histogram!("prediction_processing_seconds").record(start.elapsed().as_secs_f64());
        PredictOutcome { result, source }
    }
}
