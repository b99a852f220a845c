//! Cache configuration.
//!
//! # Example
//!
//! ```
//! use shelfcache::CacheConfig;
//!
//! // Minimal config (uses default budgets)
//! let config = CacheConfig::new("/var/cache/blobs");
//! assert_eq!(config.max_recent_bytes, 256 * 1024 * 1024); // 256 MiB
//!
//! // Full config
//! let config = CacheConfig {
//!     max_recent_bytes: 64 * 1024 * 1024,  // 64 MiB
//!     max_aged_bytes: 512 * 1024 * 1024,   // 512 MiB
//!     system_block_size: 4096,
//!     ..CacheConfig::new("/var/cache/blobs")
//! };
//! assert_eq!(config.system_block_size, 4096);
//! ```

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for a [`Cache`](crate::Cache).
///
/// The base directory is required; both byte budgets and the per-item block
/// overhead have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory the payload files live in.
    pub base_path: PathBuf,

    /// Byte budget of the recent tier (default: 256 MiB).
    #[serde(default = "default_max_recent_bytes")]
    pub max_recent_bytes: usize,

    /// Byte budget of the aged tier (default: 1 GiB).
    #[serde(default = "default_max_aged_bytes")]
    pub max_aged_bytes: usize,

    /// Extra bytes charged per item on top of the payload length, to account
    /// for filesystem block padding (default: 0).
    #[serde(default)]
    pub system_block_size: usize,
}

fn default_max_recent_bytes() -> usize {
    256 * 1024 * 1024 // 256 MiB
}

fn default_max_aged_bytes() -> usize {
    1024 * 1024 * 1024 // 1 GiB
}

impl CacheConfig {
    /// Config with default budgets under `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            max_recent_bytes: default_max_recent_bytes(),
            max_aged_bytes: default_max_aged_bytes(),
            system_block_size: 0,
        }
    }
}
