use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::models::detection::{DetectionResult, Verdict};
use crate::models::upload::SequenceLength;

/// Mock confidences are drawn from `[80, 100)`.
pub const MOCK_CONFIDENCE_RANGE: std::ops::Range<u32> = 80..100;

/// Route prefix under which placeholder images are served.
pub const PLACEHOLDER_PREFIX: &str = "/api/static/placeholder";

/// Fabricates plausible results when no inference backend is available.
pub struct MockGenerator {
    rng: Mutex<StdRng>,
    delay: Duration,
}

impl MockGenerator {
    pub fn new(delay: Duration) -> Self {
        Self::with_rng(StdRng::from_os_rng(), delay)
    }

    /// Deterministic generator for tests and reproducible demos.
    pub fn seeded(seed: u64, delay: Duration) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), delay)
    }

    pub fn with_rng(rng: StdRng, delay: Duration) -> Self {
        Self {
            rng: Mutex::new(rng),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Build a result without waiting.
    pub fn generate(&self, sequence_length: SequenceLength, file_name: &str) -> DetectionResult {
        let (verdict, confidence) = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let verdict = if rng.random_bool(0.5) {
                Verdict::Real
            } else {
                Verdict::Fake
            };
            (verdict, rng.random_range(MOCK_CONFIDENCE_RANGE))
        };

        let count = sequence_length.get();
        DetectionResult {
            verdict,
            confidence: f64::from(confidence),
            frame_images: placeholder_refs("frame", count),
            face_images: placeholder_refs("face", count),
            source_video_ref: format!("upload://{}/{}", Uuid::new_v4(), file_name),
            processing_time_seconds: Some(self.delay.as_secs_f64()),
            frames_analyzed: Some(count),
        }
    }

    /// Sleep for the configured delay, then build a result.
    pub async fn generate_delayed(
        &self,
        sequence_length: SequenceLength,
        file_name: &str,
    ) -> DetectionResult {
        tokio::time::sleep(self.delay).await;
        self.generate(sequence_length, file_name)
    }
}

fn placeholder_refs(kind: &str, count: u32) -> Vec<String> {
    (1..=count)
        .map(|i| format!("{PLACEHOLDER_PREFIX}/{kind}-{i}.jpg"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_counts_match_sequence_length() {
        let mock = MockGenerator::seeded(7, Duration::ZERO);
        for requested in (10..=100).step_by(10) {
            let len = SequenceLength::clamped(requested);
            let result = mock.generate(len, "clip.mp4");
            assert_eq!(result.frame_images.len(), requested as usize);
            assert_eq!(result.face_images.len(), requested as usize);
            assert_eq!(result.frames_analyzed, Some(requested as u32));
        }
    }

    #[test]
    fn test_confidence_stays_in_range() {
        let mock = MockGenerator::seeded(42, Duration::ZERO);
        for _ in 0..500 {
            let result = mock.generate(SequenceLength::DEFAULT, "clip.mp4");
            assert!(result.confidence >= 80.0 && result.confidence < 100.0);
            assert_eq!(result.confidence.fract(), 0.0);
        }
    }

    #[test]
    fn test_both_verdicts_occur() {
        let mock = MockGenerator::seeded(1, Duration::ZERO);
        let verdicts: Vec<Verdict> = (0..64)
            .map(|_| mock.generate(SequenceLength::DEFAULT, "clip.mp4").verdict)
            .collect();
        assert!(verdicts.contains(&Verdict::Real));
        assert!(verdicts.contains(&Verdict::Fake));
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = MockGenerator::seeded(99, Duration::ZERO);
        let b = MockGenerator::seeded(99, Duration::ZERO);
        for _ in 0..10 {
            let left = a.generate(SequenceLength::DEFAULT, "clip.mp4");
            let right = b.generate(SequenceLength::DEFAULT, "clip.mp4");
            assert_eq!(left.verdict, right.verdict);
            assert_eq!(left.confidence, right.confidence);
            assert_eq!(left.frame_images, right.frame_images);
        }
    }

    #[test]
    fn test_placeholder_names_are_indexed() {
        let mock = MockGenerator::seeded(3, Duration::ZERO);
        let result = mock.generate(SequenceLength::clamped(10), "in.mov");
        assert_eq!(result.frame_images[0], "/api/static/placeholder/frame-1.jpg");
        assert_eq!(result.face_images[9], "/api/static/placeholder/face-10.jpg");
        assert!(result.source_video_ref.starts_with("upload://"));
        assert!(result.source_video_ref.ends_with("/in.mov"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_generation_waits() {
        let mock = MockGenerator::seeded(5, Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        let result = mock.generate_delayed(SequenceLength::DEFAULT, "clip.mp4").await;
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(result.frame_images.len(), 40);
    }
}
