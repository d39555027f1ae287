//! Local media store for normalized capture audio.
//!
//! Canonical WAVs land under the configured media directory with uuid
//! filenames; the stored path doubles as the `media_url` column value.
//! Blob-storage backends are out of scope — this is deliberately a thin
//! disk writer.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the media directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create media dir: {e}")))
    }

    /// Persist a byte buffer, returning the relative URL path of the file.
    pub async fn store(&self, bytes: &[u8], extension: &str) -> AppResult<String> {
        self.ensure_dir().await?;
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.dir.join(&filename);
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to write media file: {e}")))?;
        Ok(format!("/media/{}", filename))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let dir = std::env::temp_dir().join(format!("snacktrack-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&dir);

        let url = store.store(b"RIFF....", "wav").await.unwrap();
        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".wav"));

        let filename = url.strip_prefix("/media/").unwrap();
        let on_disk = fs::read(dir.join(filename)).await.unwrap();
        assert_eq!(on_disk, b"RIFF....");

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
