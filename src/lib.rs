//! # shelfcache
//!
//! A size-bounded, two-tier on-disk cache for opaque byte payloads.
//!
//! ## Architecture
//!
//! Every payload carries two timestamps: an *item date* chosen by the
//! producer (the intrinsic recency of the data) and an *insertion date*
//! stamped at admission. Retention runs in two stages with independent byte
//! budgets:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Write(key, …)                         │
//! │  • duplicate keys only refresh the insertion date           │
//! │  • payload persisted through a pluggable Backend            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Stage 1: recent tier (insertion date)            │
//! │  • min-heap bounded by max_recent_bytes                     │
//! │  • overflow pops the least recently admitted items          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                     (demotion candidates)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Stage 2: aged tier (item date)                 │
//! │  • min-heap bounded by max_aged_bytes                       │
//! │  • keeps the intrinsically newest of the demoted items      │
//! │  • losers are dropped, payloads deleted asynchronously      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing but the payload files themselves is persisted: the filename
//! encodes the key and item date, and a restart rebuilds the index from a
//! directory listing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Utc;
//! use shelfcache::{Cache, CacheConfig, FsBackend};
//!
//! #[tokio::main]
//! async fn main() -> shelfcache::Result<()> {
//!     let config = CacheConfig {
//!         max_recent_bytes: 64 * 1024 * 1024,   // 64 MiB
//!         max_aged_bytes: 256 * 1024 * 1024,    // 256 MiB
//!         ..CacheConfig::new("/var/cache/blobs")
//!     };
//!
//!     // Rebuilds the index from files already on disk.
//!     let cache = Cache::new_initialized(config, Arc::new(FsBackend::new())).await?;
//!
//!     cache.write("block.12345", Utc::now(), Utc::now(), b"payload").await?;
//!
//!     if let Some(bytes) = cache.read("block.12345").await? {
//!         println!("cached {} bytes", bytes.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Two-stage retention**: admission recency and intrinsic recency are
//!   tracked separately, so a burst of writes does not discard data that is
//!   still new by its own clock
//! - **Restart rebuild**: the index reconstructs from the directory listing,
//!   re-running the eviction engine against the configured budgets
//! - **Pluggable storage**: filesystem and in-memory backends included,
//!   anything implementing [`Backend`] works
//! - **Asynchronous deletes**: evicted payloads are removed off the write
//!   path, failures logged and counted
//!
//! ## Modules
//!
//! - [`cache`]: the admission-and-eviction engine
//! - [`heap`]: size-accounted min-heaps parameterized by ordering
//! - [`item`]: entry metadata and the filename codec
//! - [`storage`]: payload backends
//! - [`config`]: construction-time configuration
//! - [`metrics`]: counters and gauges for the embedding application

pub mod cache;
pub mod config;
pub mod error;
pub mod heap;
pub mod item;
pub mod metrics;
pub mod storage;

pub use cache::{Cache, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use heap::{by_insertion_time, by_item_date, OrderFn, SizeBoundedHeap};
pub use item::CacheItem;
pub use storage::{Backend, FsBackend, InMemoryBackend, StorageError};
