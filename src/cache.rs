// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The admission-and-eviction engine.
//!
//! [`Cache`] owns a key index and two size-bounded heaps over the same
//! items: `recent`, ordered by insertion date, and `aged`, ordered by item
//! date. Together they implement a two-stage retention policy:
//!
//! 1. `recent` keeps whatever was admitted last. Admitting a payload pops
//!    the least recently inserted items until the payload fits.
//! 2. Each popped item is a demotion candidate for `aged`. If `aged` has
//!    room it is demoted; if not, the candidate's item date is arbitrated
//!    against the entry at the tail of the aged heap's backing array: when
//!    the tail entry is intrinsically older, aged items are evicted to make
//!    room and the candidate is demoted, otherwise the candidate itself is
//!    dropped and its payload deleted.
//!
//! The arbitration keeps data whose *intrinsic* recency is high even when a
//! burst of admissions has pushed it out of the recent tier.
//!
//! # Thread safety
//!
//! One reader-writer lock guards the index and both heaps. `write` holds it
//! exclusively for the whole admission, including the backend write; `read`
//! holds it shared for the lookup and the backend read. Payload deletions
//! run on detached tasks and are never awaited by callers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::heap::{by_insertion_time, by_item_date, SizeBoundedHeap};
use crate::item::{self, CacheItem};
use crate::metrics;
use crate::storage::Backend;

/// Two-tier, size-bounded cache of byte payloads over a [`Backend`].
pub struct Cache {
    base_path: PathBuf,
    system_block_size: usize,
    inner: RwLock<CacheInner>,
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("base_path", &self.base_path)
            .field("system_block_size", &self.system_block_size)
            .finish_non_exhaustive()
    }
}

/// Index and heaps, guarded together by one lock.
///
/// Every indexed item is held by exactly one heap, and every held item is
/// indexed; the heaps are disjoint by key.
#[derive(Debug)]
struct CacheInner {
    index: HashMap<String, Arc<CacheItem>>,
    recent: SizeBoundedHeap,
    aged: SizeBoundedHeap,
}

/// Point-in-time sizes of the cache tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub items: usize,
    pub recent_items: usize,
    pub recent_bytes: usize,
    pub aged_items: usize,
    pub aged_bytes: usize,
}

impl Cache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            base_path: config.base_path,
            system_block_size: config.system_block_size,
            inner: RwLock::new(CacheInner {
                index: HashMap::new(),
                recent: SizeBoundedHeap::new(by_insertion_time, config.max_recent_bytes),
                aged: SizeBoundedHeap::new(by_item_date, config.max_aged_bytes),
            }),
            backend,
        }
    }

    /// Construct a cache and rebuild its index from the files already in the
    /// base directory.
    ///
    /// Files are admitted in listing order through the normal admission path
    /// (without rewriting payloads), with their on-disk size and
    /// modification time standing in for size and insertion date. The
    /// rebuilt tiers honor the byte budgets, so with small budgets not every
    /// file on disk survives; the losers' payloads are scheduled for
    /// deletion. A filename that does not decode aborts the rebuild.
    pub async fn new_initialized(config: CacheConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        let cache = Self::new(config, backend);
        cache.load_from_disk().await?;
        Ok(cache)
    }

    async fn load_from_disk(&self) -> Result<()> {
        info!(base_path = %self.base_path.display(), "initializing cache from disk");

        let scan_err = |source| CacheError::Scan {
            path: self.base_path.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.base_path).await.map_err(scan_err)?;

        let mut file_count = 0usize;
        while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
            let meta = entry.metadata().await.map_err(scan_err)?;
            if !meta.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let (key, item_date) = item::parse_file_name(&name)?;
            let inserted_at: DateTime<Utc> = meta.modified().map_err(scan_err)?.into();

            let item = Arc::new(CacheItem::new(
                key,
                entry.path(),
                meta.len() as usize + self.system_block_size,
                item_date,
                inserted_at,
            ));

            debug!(item = %item, "loading file into cache");
            self.admit(item, &[], true).await?;
            file_count += 1;
        }

        info!(file_count, "cache index rebuilt");
        Ok(())
    }

    /// Admit a payload under `key`.
    ///
    /// Runs the full two-stage eviction before the payload is persisted, so
    /// a single call can demote and drop other entries. Re-admitting a key
    /// that is still cached refreshes its insertion date and writes nothing;
    /// the stored payload, size, and item date are kept.
    ///
    /// On a backend write failure the new item is not installed, but
    /// evictions performed on its behalf are not rolled back.
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn write(
        &self,
        key: &str,
        item_date: DateTime<Utc>,
        inserted_at: DateTime<Utc>,
        payload: &[u8],
    ) -> Result<Arc<CacheItem>> {
        if key.is_empty() || key.contains(item::KEY_SEPARATOR) {
            return Err(CacheError::InvalidKey { key: key.to_owned() });
        }

        let file_path = item::file_path(&self.base_path, key, item_date);
        let item = Arc::new(CacheItem::new(
            key,
            file_path,
            payload.len() + self.system_block_size,
            item_date,
            inserted_at,
        ));

        self.admit(item, payload, false).await
    }

    async fn admit(
        &self,
        item: Arc<CacheItem>,
        payload: &[u8],
        skip_payload_write: bool,
    ) -> Result<Arc<CacheItem>> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.index.get(item.key()) {
            existing.touch(item.inserted_at());
            metrics::record_refresh();
            debug!(key = item.key(), "key already cached, refreshed insertion date");
            return Ok(Arc::clone(existing));
        }

        // Demotion candidates also make room for payloads larger than the
        // whole recent budget; such a payload drains the heap and is
        // admitted anyway, leaving the tier transiently over budget.
        let needed = payload.len() as i64;
        let demoted = purge(&mut inner.recent, needed);

        for candidate in demoted {
            if inner.aged.free_space() >= candidate.size() as i64 {
                metrics::record_demotions(1);
                inner.aged.push(candidate);
                continue;
            }

            // Aged tier is full. The candidate only displaces aged entries
            // when the tail of the aged backing array is intrinsically older
            // than the candidate itself.
            let tail_is_older = inner
                .aged
                .peek_tail()
                .is_some_and(|tail| tail.item_date() < candidate.item_date());

            if tail_is_older {
                let victims = purge(&mut inner.aged, needed);
                let victim_bytes: usize = victims.iter().map(|v| v.size()).sum();
                for victim in &victims {
                    inner.index.remove(victim.key());
                    self.delete_payload(victim);
                }

                debug!(
                    key = candidate.key(),
                    evicted = victims.len(),
                    "demoted to aged tier after evicting older entries"
                );
                metrics::record_drops(victims.len(), victim_bytes);
                metrics::record_demotions(1);
                inner.aged.push(candidate);
            } else {
                debug!(key = candidate.key(), "dropped, older than the aged tier");
                inner.index.remove(candidate.key());
                self.delete_payload(&candidate);
                metrics::record_drops(1, candidate.size());
            }
        }

        if !skip_payload_write {
            self.backend
                .write(item.file_path(), payload)
                .await
                .map_err(|source| CacheError::WritePayload {
                    path: item.file_path().to_owned(),
                    source,
                })?;
        }

        inner.index.insert(item.key().to_owned(), Arc::clone(&item));
        inner.recent.push(Arc::clone(&item));

        metrics::record_admission(item.size());
        metrics::set_tier_sizes(
            inner.recent.size_bytes(),
            inner.recent.len(),
            inner.aged.size_bytes(),
            inner.aged.len(),
        );

        Ok(item)
    }

    /// Load the payload for `key`.
    ///
    /// `Ok(None)` when the key is not cached; a backend failure for a key
    /// that is indexed surfaces as an error. Reads do not refresh recency;
    /// retention is driven by admission alone.
    #[tracing::instrument(skip(self))]
    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().await;

        let Some(found) = inner.index.get(key) else {
            metrics::record_read(false);
            debug!("cache miss");
            return Ok(None);
        };

        metrics::record_read(true);
        // The shared guard stays held across the backend read; admissions
        // serialize behind it.
        let data = self.backend.read(found.file_path()).await?;
        Ok(Some(data))
    }

    /// Whether `key` is currently indexed.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.read().await.index.contains_key(key)
    }

    /// Number of indexed entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.index.is_empty()
    }

    /// Point-in-time tier sizes.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            items: inner.index.len(),
            recent_items: inner.recent.len(),
            recent_bytes: inner.recent.size_bytes(),
            aged_items: inner.aged.len(),
            aged_bytes: inner.aged.size_bytes(),
        }
    }

    /// Keys currently held by the recent tier, in internal heap order.
    pub async fn recent_keys(&self) -> Vec<String> {
        self.inner.read().await.recent.keys()
    }

    /// Keys currently held by the aged tier, in internal heap order.
    pub async fn aged_keys(&self) -> Vec<String> {
        self.inner.read().await.aged.keys()
    }

    /// Schedule asynchronous deletion of an evicted payload.
    ///
    /// Fire-and-forget: failures are logged and counted, never surfaced, and
    /// callers must not rely on the disk being free when admission returns.
    fn delete_payload(&self, item: &Arc<CacheItem>) {
        let backend = Arc::clone(&self.backend);
        let key = item.key().to_owned();
        let path = item.file_path().to_owned();

        tokio::spawn(async move {
            if let Err(error) = backend.delete(&path).await {
                metrics::record_delete_failure();
                warn!(key = %key, error = %error, "failed to delete evicted payload");
            }
        });
    }
}

/// Pop items until the heap can absorb `needed` more bytes, or until it is
/// exhausted. The popped items are returned in pop order.
fn purge(heap: &mut SizeBoundedHeap, needed: i64) -> Vec<Arc<CacheItem>> {
    let mut evicted = Vec::new();
    while heap.free_space() < needed {
        match heap.pop() {
            Some(item) => evicted.push(item),
            None => break,
        }
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap()
    }

    fn ttime(offset: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(offset)
    }

    fn test_cache(max_recent: usize, max_aged: usize) -> (Cache, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let config = CacheConfig {
            max_recent_bytes: max_recent,
            max_aged_bytes: max_aged,
            ..CacheConfig::new("/tmp")
        };
        (Cache::new(config, Arc::clone(&backend) as Arc<dyn Backend>), backend)
    }

    #[tokio::test]
    async fn rejects_empty_key() {
        let (cache, _) = test_cache(100, 100);

        let err = cache.write("", ttime(0), ttime(0), b"abc").await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey { .. }));
    }

    #[tokio::test]
    async fn rejects_key_containing_separator() {
        let (cache, backend) = test_cache(100, 100);

        let err = cache
            .write("key-0", ttime(0), ttime(0), b"abc")
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::InvalidKey { .. }));
        assert_eq!(backend.writes(), 0);
    }

    #[tokio::test]
    async fn duplicate_key_refreshes_insertion_date_only() {
        let (cache, backend) = test_cache(100, 100);

        let first = cache.write("key.0", ttime(0), ttime(0), b"abc").await.unwrap();
        let second = cache
            .write("key.0", ttime(5), ttime(5), b"1234567")
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.size(), 3);
        assert_eq!(second.item_date(), ttime(0));
        assert_eq!(second.inserted_at(), ttime(5));
        assert_eq!(cache.len().await, 1);
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn read_missing_key_is_none() {
        let (cache, _) = test_cache(100, 100);
        assert!(cache.read("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_returns_the_written_payload() {
        let (cache, _) = test_cache(100, 100);

        cache.write("key.0", ttime(0), ttime(0), b"payload").await.unwrap();

        let data = cache.read("key.0").await.unwrap().unwrap();
        assert_eq!(data, b"payload");
    }

    #[tokio::test]
    async fn read_surfaces_backend_failure_for_indexed_key() {
        let (cache, backend) = test_cache(100, 100);

        cache.write("key.0", ttime(0), ttime(0), b"payload").await.unwrap();
        backend.clear();

        let err = cache.read("key.0").await.unwrap_err();
        assert!(matches!(err, CacheError::Storage(_)));
    }

    #[tokio::test]
    async fn oversized_payload_is_admitted_over_budget() {
        let (cache, _) = test_cache(3, 100);

        cache.write("key.0", ttime(0), ttime(0), b"1234").await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.recent_items, 1);
        assert_eq!(stats.recent_bytes, 4);
        assert!(cache.contains("key.0").await);
    }

    #[tokio::test]
    async fn oversized_resident_is_evicted_by_next_admission() {
        let (cache, _) = test_cache(3, 100);

        cache.write("key.0", ttime(0), ttime(0), b"1234").await.unwrap();
        cache.write("key.1", ttime(1), ttime(1), b"abc").await.unwrap();

        assert_eq!(cache.recent_keys().await, vec!["key.1"]);
        assert_eq!(cache.aged_keys().await, vec!["key.0"]);
    }

    #[tokio::test]
    async fn zero_aged_budget_drops_demotion_candidates() {
        let (cache, _) = test_cache(3, 0);

        cache.write("key.0", ttime(0), ttime(0), b"abc").await.unwrap();
        cache.write("key.1", ttime(1), ttime(1), b"def").await.unwrap();

        assert!(!cache.contains("key.0").await);
        assert!(cache.contains("key.1").await);
        assert!(cache.aged_keys().await.is_empty());
    }
}
