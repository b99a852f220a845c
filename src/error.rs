//! Crate-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Keys name payload files, so they must be non-empty and must not
    /// contain the key/date separator.
    #[error("invalid key {key:?}: keys must be non-empty and must not contain '-'")]
    InvalidKey { key: String },

    /// A file in the cache directory does not round-trip through the
    /// filename codec.
    #[error("invalid cache file name {name:?}: {reason}")]
    FileName { name: String, reason: String },

    /// Listing or inspecting the cache directory failed during the startup
    /// rebuild.
    #[error("scanning cache directory {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend failed to persist a payload during admission.
    #[error("writing payload {}: {source}", path.display())]
    WritePayload {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    /// The backend failed to load a payload for a key that is indexed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
