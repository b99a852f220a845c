// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Size-accounted binary min-heaps over shared cache items.
//!
//! The retention engine runs two heaps over the same item type under
//! different orderings, so the ordering is a plain function over the backing
//! array and two indices rather than an `Ord` bound on the element. `pop`
//! yields the minimum under the configured ordering; [`peek_tail`] exposes
//! the last element of the backing array, which is the element the admission
//! engine arbitrates demotions against (see the `cache` module).
//!
//! [`peek_tail`]: SizeBoundedHeap::peek_tail

use std::sync::Arc;

use crate::item::CacheItem;

/// Ordering over the backing array: `true` when the item at `i` sorts before
/// the item at `j`.
pub type OrderFn = fn(&[Arc<CacheItem>], usize, usize) -> bool;

/// Ascending insertion date: pops yield the least recently admitted item.
pub fn by_insertion_time(items: &[Arc<CacheItem>], i: usize, j: usize) -> bool {
    items[i].inserted_at_millis() < items[j].inserted_at_millis()
}

/// Ascending item date: pops yield the intrinsically oldest item.
pub fn by_item_date(items: &[Arc<CacheItem>], i: usize, j: usize) -> bool {
    items[i].item_date() < items[j].item_date()
}

/// A binary min-heap of cache items bounded by the total bytes it holds.
///
/// The bound is advisory: `push` never refuses an item. Callers watch
/// [`free_space`](Self::free_space) and evict before pushing; the admission
/// engine deliberately drives a heap over budget in two situations (a single
/// oversized payload, and the startup rebuild).
#[derive(Debug)]
pub struct SizeBoundedHeap {
    items: Vec<Arc<CacheItem>>,
    less: OrderFn,
    size_bytes: usize,
    max_size_bytes: usize,
}

impl SizeBoundedHeap {
    #[must_use]
    pub fn new(less: OrderFn, max_size_bytes: usize) -> Self {
        Self {
            items: Vec::new(),
            less,
            size_bytes: 0,
            max_size_bytes,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the charged sizes of the held items.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    #[must_use]
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Remaining byte budget. Negative when the heap is over budget.
    #[must_use]
    pub fn free_space(&self) -> i64 {
        self.max_size_bytes as i64 - self.size_bytes as i64
    }

    pub fn push(&mut self, item: Arc<CacheItem>) {
        self.size_bytes += item.size();
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    /// Remove and return the minimum under the ordering, or `None` when
    /// empty.
    pub fn pop(&mut self) -> Option<Arc<CacheItem>> {
        let last = self.items.len().checked_sub(1)?;
        self.items.swap(0, last);
        let item = self.items.pop()?;
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        self.size_bytes -= item.size();
        Some(item)
    }

    /// The last element of the backing array.
    ///
    /// This is some leaf of the heap, not necessarily the maximum under the
    /// ordering. The admission engine consults it when deciding whether a
    /// demotion candidate displaces aged items or is dropped.
    #[must_use]
    pub fn peek_tail(&self) -> Option<&Arc<CacheItem>> {
        self.items.last()
    }

    /// The minimum under the ordering: the item the next `pop` returns.
    #[must_use]
    pub fn peek_min(&self) -> Option<&Arc<CacheItem>> {
        self.items.first()
    }

    /// Remove the item with `key`, if held, restoring the heap property.
    pub fn remove(&mut self, key: &str) -> Option<Arc<CacheItem>> {
        let at = self.items.iter().position(|item| item.key() == key)?;
        let last = self.items.len() - 1;
        self.items.swap(at, last);
        let item = self.items.pop()?;
        if at < self.items.len() {
            self.sift_down(at);
            self.sift_up(at);
        }
        self.size_bytes -= item.size();
        Some(item)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.items.iter().map(|item| item.key().to_owned()).collect()
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if !(self.less)(&self.items, at, parent) {
                break;
            }
            self.items.swap(at, parent);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * at + 1;
            if left >= len {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < len && (self.less)(&self.items, right, left) {
                child = right;
            }
            if !(self.less)(&self.items, child, at) {
                break;
            }
            self.items.swap(at, child);
            at = child;
        }
    }
}
