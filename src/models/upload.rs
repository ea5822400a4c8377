use std::fmt;
use std::path::Path;

use bytes::Bytes;
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Multipart field carrying the video.
pub const VIDEO_FIELD: &str = "upload_video_file";

/// Multipart field carrying the requested sequence length.
pub const SEQUENCE_LENGTH_FIELD: &str = "sequence_length";

/// Upload ceiling: 100 MiB.
pub const MAX_VIDEO_BYTES: u64 = 100 * 1024 * 1024;

/// Supported video containers, keyed by file extension.
#[derive(Debug, Clone, Copy, EnumString, EnumIter, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VideoFormat {
    Mp4,
    Avi,
    Mov,
    Mkv,
    Webm,
}

impl VideoFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "video/mp4",
            VideoFormat::Avi => "video/x-msvideo",
            VideoFormat::Mov => "video/quicktime",
            VideoFormat::Mkv => "video/x-matroska",
            VideoFormat::Webm => "video/webm",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        let format = VideoFormat::iter().find(|f| f.mime_type().eq_ignore_ascii_case(essence));
        format.or(match essence.to_ascii_lowercase().as_str() {
            "video/avi" | "video/msvideo" => Some(VideoFormat::Avi),
            "video/mkv" => Some(VideoFormat::Mkv),
            _ => None,
        })
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// The declared MIME type wins; the extension is the fallback for
    /// generic types such as `application/octet-stream`.
    pub fn detect(file_name: &str, mime_type: Option<&str>) -> Option<Self> {
        mime_type
            .and_then(Self::from_mime)
            .or_else(|| Self::from_file_name(file_name))
    }
}

/// Requested number of sampled frames/faces: [10, 100] in steps of 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceLength(u32);

impl SequenceLength {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 100;
    pub const STEP: u32 = 10;
    pub const DEFAULT: SequenceLength = SequenceLength(40);

    /// Clamp into range and round to the nearest step.
    pub fn clamped(requested: i64) -> Self {
        let bounded = requested.clamp(Self::MIN as i64, Self::MAX as i64) as u32;
        let stepped = (bounded + Self::STEP / 2) / Self::STEP * Self::STEP;
        SequenceLength(stepped.clamp(Self::MIN, Self::MAX))
    }

    /// Parse a form value. Blank input yields the default.
    pub fn parse(raw: &str) -> Result<Self, SequenceLengthError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::DEFAULT);
        }
        raw.parse::<i64>()
            .map(Self::clamped)
            .map_err(|_| SequenceLengthError(raw.to_string()))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for SequenceLength {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SequenceLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("sequence_length must be an integer, got {0:?}")]
pub struct SequenceLengthError(pub String);

/// A video selected for upload.
#[derive(Debug, Clone, Validate)]
pub struct VideoFile {
    #[garde(length(min = 1))]
    pub file_name: String,

    #[garde(skip)]
    pub mime_type: String,

    #[garde(required)]
    pub format: Option<VideoFormat>,

    #[garde(range(min = 1, max = MAX_VIDEO_BYTES))]
    pub size_bytes: u64,

    #[garde(skip)]
    pub bytes: Bytes,
}

impl VideoFile {
    /// Build from in-memory bytes; the MIME type is guessed from the file
    /// name when not declared.
    pub fn new(file_name: impl Into<String>, mime_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let bytes = bytes.into();
        let format = VideoFormat::detect(&file_name, mime_type);
        let mime_type = match mime_type {
            Some(mime) => mime.to_string(),
            None => mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        Self {
            file_name,
            mime_type,
            format,
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();
        Ok(Self::new(file_name, None, bytes))
    }

    /// Size and type checks performed before anything is transmitted.
    pub fn check(&self) -> Result<(), ValidationError> {
        let Err(report) = self.validate() else {
            return Ok(());
        };

        let Some((path, error)) = report.iter().next() else {
            return Ok(());
        };

        Err(match path.to_string().as_str() {
            "size_bytes" if self.size_bytes == 0 => ValidationError::Empty,
            "size_bytes" => ValidationError::TooLarge {
                size_bytes: self.size_bytes,
            },
            "format" => ValidationError::UnsupportedType {
                file_name: self.file_name.clone(),
                mime_type: self.mime_type.clone(),
            },
            other => ValidationError::Invalid(format!("{other}: {error}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("File size must be less than 100MB (got {size_bytes} bytes)")]
    TooLarge { size_bytes: u64 },

    #[error("The selected file is empty")]
    Empty,

    #[error("Unsupported video type for {file_name} ({mime_type}); supported: MP4, AVI, MOV, MKV, WebM")]
    UnsupportedType { file_name: String, mime_type: String },

    #[error("Invalid video: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_length_clamps_and_steps() {
        assert_eq!(SequenceLength::clamped(0).get(), 10);
        assert_eq!(SequenceLength::clamped(-50).get(), 10);
        assert_eq!(SequenceLength::clamped(10).get(), 10);
        assert_eq!(SequenceLength::clamped(44).get(), 40);
        assert_eq!(SequenceLength::clamped(45).get(), 50);
        assert_eq!(SequenceLength::clamped(100).get(), 100);
        assert_eq!(SequenceLength::clamped(1000).get(), 100);
    }

    #[test]
    fn test_sequence_length_parse() {
        assert_eq!(SequenceLength::parse("").unwrap(), SequenceLength::DEFAULT);
        assert_eq!(SequenceLength::parse(" 60 ").unwrap().get(), 60);
        assert!(SequenceLength::parse("forty").is_err());
        assert!(SequenceLength::parse("4.5").is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(VideoFormat::detect("clip.MP4", None), Some(VideoFormat::Mp4));
        assert_eq!(
            VideoFormat::detect("clip.bin", Some("video/quicktime")),
            Some(VideoFormat::Mov)
        );
        assert_eq!(
            VideoFormat::detect("clip.mkv", Some("application/octet-stream")),
            Some(VideoFormat::Mkv)
        );
        assert_eq!(
            VideoFormat::detect("clip", Some("video/webm; codecs=vp9")),
            Some(VideoFormat::Webm)
        );
        assert_eq!(VideoFormat::detect("notes.txt", Some("text/plain")), None);
        assert_eq!(VideoFormat::detect("clip.flv", None), None);
    }

    #[test]
    fn test_guesses_mime_from_extension() {
        let file = VideoFile::new("movie.webm", None, vec![1u8; 8]);
        assert_eq!(file.mime_type, "video/webm");
        assert_eq!(file.format, Some(VideoFormat::Webm));
        assert_eq!(file.size_bytes, 8);
        assert!(file.check().is_ok());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let bytes = vec![0u8; MAX_VIDEO_BYTES as usize + 1];
        let file = VideoFile::new("big.mp4", Some("video/mp4"), bytes);
        assert_eq!(
            file.check(),
            Err(ValidationError::TooLarge {
                size_bytes: MAX_VIDEO_BYTES + 1
            })
        );
    }

    #[test]
    fn test_accepts_file_at_ceiling() {
        let bytes = vec![0u8; MAX_VIDEO_BYTES as usize];
        let file = VideoFile::new("edge.mov", None, bytes);
        assert!(file.check().is_ok());
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let file = VideoFile::new("photo.png", None, vec![1u8; 16]);
        assert!(matches!(
            file.check(),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_file() {
        let file = VideoFile::new("empty.mp4", None, Vec::new());
        assert_eq!(file.check(), Err(ValidationError::Empty));
    }
}
