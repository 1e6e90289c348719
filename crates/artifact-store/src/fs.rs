//! Filesystem-backed artifact store.

use async_trait::async_trait;
use cdp_adapter::ByteSource;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::StoreError;

/// Persistent destination for captured downloads.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create the destination directory (and parents) if missing.
    async fn ensure_directory(&self, path: &Path) -> Result<(), StoreError>;

    /// Persist `source` at `path`. Never overwrites an existing file.
    async fn write(&self, path: &Path, source: ByteSource) -> Result<PathBuf, StoreError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsArtifactStore;

impl FsArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn ensure_directory(&self, path: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(path)
            .await
            .map_err(|err| StoreError::io(path, err))
    }

    async fn write(&self, path: &Path, source: ByteSource) -> Result<PathBuf, StoreError> {
        let mut file = create_new(path).await?;

        let copied = match &source {
            ByteSource::Memory(bytes) => file.write_all(bytes).await.map(|_| bytes.len() as u64),
            ByteSource::File(staged) => copy_from(staged, &mut file).await,
        };
        let flushed = match copied {
            Ok(len) => file.sync_all().await.map(|_| len),
            Err(err) => Err(err),
        };

        let len = match flushed {
            Ok(len) => len,
            Err(err) => {
                drop(file);
                remove_partial(path).await;
                return Err(StoreError::io(path, err));
            }
        };
        debug!(path = %path.display(), bytes = len, "artifact written");

        if let ByteSource::File(staged) = source {
            if let Err(err) = fs::remove_file(&staged).await {
                warn!(path = %staged.display(), "failed to remove staged download: {}", err);
            }
        }
        Ok(path.to_path_buf())
    }
}

async fn create_new(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(path.to_path_buf()),
            _ => StoreError::io(path, err),
        })
}

async fn copy_from(staged: &Path, dest: &mut File) -> io::Result<u64> {
    let mut src = File::open(staged).await?;
    tokio::io::copy(&mut src, dest).await
}

async fn remove_partial(path: &Path) {
    let _ = fs::remove_file(path).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_memory_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new();
        let target = dir.path().join("1700000000_report.csv");

        let saved = store
            .write(&target, ByteSource::Memory(b"id,status\n".to_vec()))
            .await
            .unwrap();

        assert_eq!(saved, target);
        assert_eq!(std::fs::read(&saved).unwrap(), b"id,status\n");
    }

    #[tokio::test]
    async fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new();
        let target = dir.path().join("1700000000_report.csv");
        std::fs::write(&target, b"previous run").unwrap();

        let err = store
            .write(&target, ByteSource::Memory(b"new".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&target).unwrap(), b"previous run");
    }

    #[tokio::test]
    async fn moves_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("4f1c-guid");
        std::fs::write(&staged, b"a,b\n1,2\n").unwrap();
        let out = dir.path().join("out");
        let store = FsArtifactStore::new();
        store.ensure_directory(&out).await.unwrap();

        let saved = store
            .write(&out.join("1_export.csv"), ByteSource::File(staged.clone()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&saved).unwrap(), b"a,b\n1,2\n");
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn missing_staged_file_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("1_export.csv");

        let err = FsArtifactStore::new()
            .write(&target, ByteSource::File(dir.path().join("missing")))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn ensure_directory_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("downloads/livetrack");
        let store = FsArtifactStore::new();
        store.ensure_directory(&nested).await.unwrap();
        store.ensure_directory(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
