use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Confidence reported when the backend omits one.
pub const DEFAULT_CONFIDENCE: f64 = 85.0;

/// Binary classification outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Verdict {
    Real,
    Fake,
}

/// Detection result as returned to the upload client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    #[serde(rename = "output")]
    pub verdict: Verdict,

    pub confidence: f64,

    #[serde(rename = "preprocessed_images", default)]
    pub frame_images: Vec<String>,

    #[serde(rename = "faces_cropped_images", default)]
    pub face_images: Vec<String>,

    #[serde(rename = "original_video", default)]
    pub source_video_ref: String,

    #[serde(rename = "processing_time", skip_serializing_if = "Option::is_none", default)]
    pub processing_time_seconds: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frames_analyzed: Option<u32>,
}

/// Raw backend response. Every field is optional so schema drift never
/// breaks deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamPrediction {
    pub output: Option<String>,
    pub confidence: Option<f64>,
    pub preprocessed_images: Option<Vec<String>>,
    pub faces_cropped_images: Option<Vec<String>>,
    pub original_video: Option<String>,
    pub processing_time: Option<f64>,
    pub frames_analyzed: Option<u32>,
}

impl UpstreamPrediction {
    /// Apply fixed defaults for anything the backend left out.
    pub fn normalize(self) -> DetectionResult {
        let verdict = match self.output.as_deref().map(str::parse::<Verdict>) {
            Some(Ok(verdict)) => verdict,
            Some(Err(_)) => {
                tracing::warn!(output = ?self.output, "Unrecognized upstream verdict, defaulting to FAKE");
                Verdict::Fake
            }
            None => Verdict::Fake,
        };

        let confidence = self
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 100.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        DetectionResult {
            verdict,
            confidence,
            frame_images: self.preprocessed_images.unwrap_or_default(),
            face_images: self.faces_cropped_images.unwrap_or_default(),
            source_video_ref: self.original_video.unwrap_or_default(),
            processing_time_seconds: self.processing_time,
            frames_analyzed: self.frames_analyzed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: serde_json::Value) -> DetectionResult {
        serde_json::from_value::<UpstreamPrediction>(value)
            .unwrap()
            .normalize()
    }

    #[test]
    fn test_missing_confidence_uses_default() {
        let result = normalize(json!({ "output": "REAL" }));
        assert_eq!(result.verdict, Verdict::Real);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_missing_image_arrays_become_empty() {
        let result = normalize(json!({ "output": "REAL", "confidence": 97 }));
        assert_eq!(result.confidence, 97.0);
        assert!(result.frame_images.is_empty());
        assert!(result.face_images.is_empty());
        assert_eq!(result.source_video_ref, "");
    }

    #[test]
    fn test_empty_body_defaults_to_fake() {
        let result = normalize(json!({}));
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_null_fields_treated_as_missing() {
        let result = normalize(json!({
            "output": null,
            "confidence": null,
            "preprocessed_images": null
        }));
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
        assert!(result.frame_images.is_empty());
    }

    #[test]
    fn test_unknown_verdict_and_out_of_range_confidence() {
        let result = normalize(json!({ "output": "maybe", "confidence": 140.5 }));
        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence, 100.0);

        let lower = normalize(json!({ "output": "real", "confidence": -3 }));
        assert_eq!(lower.verdict, Verdict::Real);
        assert_eq!(lower.confidence, 0.0);
    }

    #[test]
    fn test_extra_fields_pass_through_known_ones() {
        let result = normalize(json!({
            "output": "FAKE",
            "confidence": 91.2,
            "preprocessed_images": ["a.jpg", "b.jpg"],
            "faces_cropped_images": ["c.jpg"],
            "original_video": "/media/in.mp4",
            "processing_time": 4.25,
            "frames_analyzed": 20,
            "model_version": "4.0.0"
        }));
        assert_eq!(result.frame_images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(result.face_images, vec!["c.jpg"]);
        assert_eq!(result.source_video_ref, "/media/in.mp4");
        assert_eq!(result.processing_time_seconds, Some(4.25));
        assert_eq!(result.frames_analyzed, Some(20));
    }

    #[test]
    fn test_serializes_with_wire_keys() {
        let result = DetectionResult {
            verdict: Verdict::Real,
            confidence: 88.0,
            frame_images: vec!["f".into()],
            face_images: vec![],
            source_video_ref: "upload://x".into(),
            processing_time_seconds: None,
            frames_analyzed: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["output"], "REAL");
        assert_eq!(value["preprocessed_images"], json!(["f"]));
        assert_eq!(value["faces_cropped_images"], json!([]));
        assert_eq!(value["original_video"], "upload://x");
        assert!(value.get("processing_time").is_none());
    }
}
