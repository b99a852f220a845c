use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// An operation against the local filesystem failed.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A non-filesystem backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Byte-blob store the cache persists payloads to.
///
/// The cache serializes writes and reads through its own lock but issues
/// deletions from detached tasks, so implementations must tolerate
/// concurrent calls. The backend's lifetime must outlast the cache; it is
/// shared as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create or overwrite the blob at `path`.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError>;

    /// Load the blob at `path`.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Remove the blob at `path`. Deleting a missing blob is an error; the
    /// cache logs it and moves on.
    async fn delete(&self, path: &Path) -> Result<(), StorageError>;
}
