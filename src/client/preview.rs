use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::models::upload::VideoFile;

/// Local copy of the selected video for preview. The file is removed when
/// the value is dropped, which happens when the selection is replaced or the
/// client is reset.
#[derive(Debug)]
pub struct ScopedPreview {
    file: NamedTempFile,
}

impl ScopedPreview {
    /// Writes run on the blocking pool; a selection can be up to 100 MiB.
    pub async fn create(video: &VideoFile) -> std::io::Result<Self> {
        let suffix = video
            .format
            .map(|f| format!(".{f}"))
            .unwrap_or_default();
        let bytes = video.bytes.clone();

        tokio::task::spawn_blocking(move || {
            let mut file = Builder::new()
                .prefix("preview-")
                .suffix(&suffix)
                .tempfile()?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(Self { file })
        })
        .await
        .map_err(std::io::Error::other)?
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preview_removed_on_drop() {
        let video = VideoFile::new("clip.mp4", None, vec![7u8; 32]);
        let preview = ScopedPreview::create(&video).await.unwrap();
        let path = preview.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), vec![7u8; 32]);
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));

        drop(preview);
        assert!(!path.exists());
    }
}
