//! Transient storage for uploaded documents.
//!
//! The collaborator API takes a local path, so every accepted upload is written to a file in the
//! scratch directory for the duration of one request. Each file gets a fresh UUID name, so
//! concurrent requests never touch each other's data, and is removed when its [`ScratchFile`]
//! handle is dropped. Dropping happens on every exit path out of the handler: normal return, early
//! return through `?`, panic unwinding, and cancellation of the request future.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// The process-wide scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Create the directory (and any missing parents) if needed.
    ///
    /// Called once during application startup, never per request.
    pub async fn create(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create scratch directory {}", root.display()))?;
        debug!(scratch_dir = %root.display(), "Scratch directory ready");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to a new uniquely named file with the given extension.
    ///
    /// If the write fails the partially written file is removed before the error is returned.
    #[instrument(skip(self, contents), fields(size_bytes = contents.len()), err)]
    pub async fn persist(&self, contents: &[u8], extension: &str) -> anyhow::Result<ScratchFile> {
        let path = self.root.join(format!("{}.{}", Uuid::new_v4(), extension));
        // Own the path before touching the disk so a failed write is still cleaned up
        let file = ScratchFile { path };

        tokio::fs::write(&file.path, contents)
            .await
            .with_context(|| format!("Failed to write scratch file {}", file.path.display()))?;

        debug!(scratch_file = %file.path.display(), "Wrote scratch file");
        Ok(file)
    }
}

/// A scratch file owned by a single request. Removed from disk on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(scratch_file = %self.path.display(), "Cleaned up scratch file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                scratch_file = %self.path.display(),
                error = %e,
                "Failed to clean up scratch file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_create_makes_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("a").join("b");

        let scratch = ScratchDir::create(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(scratch.path(), root.as_path());

        // Idempotent on an existing directory
        ScratchDir::create(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_is_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path()).await.unwrap();

        let file = scratch.persist(b"%PDF-1.7", "pdf").await.unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));

        drop(file);
        assert!(!path.exists());
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_each_file_gets_a_unique_name() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path()).await.unwrap();

        let first = scratch.persist(b"first", "pdf").await.unwrap();
        let second = scratch.persist(b"second", "pdf").await.unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(second.path()).unwrap(), b"second");
        assert_eq!(entries(tmp.path()), 2);
    }

    #[tokio::test]
    async fn test_drop_tolerates_already_removed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path()).await.unwrap();

        let file = scratch.persist(b"gone", "pdf").await.unwrap();
        std::fs::remove_file(file.path()).unwrap();
        drop(file);
    }

    #[tokio::test]
    async fn test_persist_into_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(tmp.path().join("scratch")).await.unwrap();
        std::fs::remove_dir(scratch.path()).unwrap();

        let err = scratch.persist(b"data", "pdf").await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write scratch file"));
    }
}
