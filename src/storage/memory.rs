use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{Backend, StorageError};

/// In-memory [`Backend`] for tests and RAM-only caches.
///
/// Tracks write and delete counts so callers can observe backend traffic,
/// including the fire-and-forget deletions the cache issues from detached
/// tasks.
pub struct InMemoryBackend {
    blobs: DashMap<PathBuf, Vec<u8>>,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// Number of blobs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.blobs.contains_key(path)
    }

    /// Successful writes since construction.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    /// Successful deletes since construction.
    #[must_use]
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Acquire)
    }

    /// Drop all blobs. Counters are kept.
    pub fn clear(&self) {
        self.blobs.clear();
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(path.to_owned(), data.to_vec());
        self.writes.fetch_add(1, Ordering::Release);
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .get(path)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| StorageError::Backend(format!("no blob at {}", path.display())))
    }

    async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        match self.blobs.remove(path) {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::Release);
                Ok(())
            }
            None => Err(StorageError::Backend(format!(
                "no blob at {}",
                path.display()
            ))),
        }
    }
}
