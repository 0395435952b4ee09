//! Per-request temporary audio files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use parley_core::error::Result;

/// An uploaded audio payload written to disk for the transcriber.
///
/// The file is removed when the guard drops, including when the handler
/// future is cancelled.
#[derive(Debug)]
pub struct TempAudioFile {
    path: PathBuf,
}

impl TempAudioFile {
    /// Write `bytes` to `<dir>/tmp_<uuid>.webm`.
    pub async fn create(dir: &Path, bytes: &[u8]) -> Result<Self> {
        let path = dir.join(format!("tmp_{}.webm", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Created temp audio file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temp audio file"),
            Err(e) => warn!(path = %self.path.display(), "Failed to remove temp audio file: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempAudioFile::create(dir.path(), b"RIFF").await.unwrap();
        let path = temp.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("tmp_") && name.ends_with(".webm"));

        drop(temp);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = TempAudioFile::create(dir.path(), b"a").await.unwrap();
        let b = TempAudioFile::create(dir.path(), b"b").await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_already_deleted_file_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempAudioFile::create(dir.path(), b"x").await.unwrap();
        std::fs::remove_file(temp.path()).unwrap();
        drop(temp);
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(TempAudioFile::create(&missing, b"x").await.is_err());
    }
}
