use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use super::traits::{Backend, StorageError};

/// Filesystem-backed [`Backend`] using platform path semantics.
///
/// Payload files are written world-accessible so sidecar tooling can inspect
/// the cache directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsBackend;

impl FsBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_owned(),
        source,
    }
}

#[async_trait]
impl Backend for FsBackend {
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        fs::write(path, data).await.map_err(|e| io_error(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))
                .await
                .map_err(|e| io_error(path, e))?;
        }

        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        fs::read(path).await.map_err(|e| io_error(path, e))
    }

    async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path).await.map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();
        let path = dir.path().join("blob");

        backend.write(&path, b"payload bytes").await.unwrap();

        let data = backend.read(&path).await.unwrap();
        assert_eq!(data, b"payload bytes");
    }

    #[tokio::test]
    async fn write_overwrites_existing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();
        let path = dir.path().join("blob");

        backend.write(&path, b"first").await.unwrap();
        backend.write(&path, b"second").await.unwrap();

        assert_eq!(backend.read(&path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn read_missing_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();

        let err = backend.read(&dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn delete_removes_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();
        let path = dir.path().join("blob");

        backend.write(&path, b"data").await.unwrap();
        backend.delete(&path).await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn delete_missing_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();

        let err = backend.delete(&dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn written_blobs_are_world_accessible() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new();
        let path = dir.path().join("blob");

        backend.write(&path, b"data").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o666);
    }
}
