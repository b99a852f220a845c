//! Metrics instrumentation for shelfcache.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the embedding
//! application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `shelfcache_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `tier`: recent, aged
//! - `status`: hit, miss

use metrics::{counter, gauge};

/// Record an admission into the recent tier.
pub fn record_admission(bytes: usize) {
    counter!("shelfcache_admissions_total").increment(1);
    counter!("shelfcache_admitted_bytes_total").increment(bytes as u64);
}

/// Record a duplicate-key admission that only refreshed the insertion date.
pub fn record_refresh() {
    counter!("shelfcache_refreshes_total").increment(1);
}

/// Record items demoted from the recent tier into the aged tier.
pub fn record_demotions(count: usize) {
    counter!("shelfcache_demotions_total").increment(count as u64);
}

/// Record items dropped from the cache entirely.
pub fn record_drops(count: usize, bytes: usize) {
    counter!("shelfcache_drops_total").increment(count as u64);
    counter!("shelfcache_dropped_bytes_total").increment(bytes as u64);
}

/// Record a read against the index.
pub fn record_read(hit: bool) {
    let status = if hit { "hit" } else { "miss" };
    counter!("shelfcache_reads_total", "status" => status).increment(1);
}

/// Record a failed asynchronous payload deletion.
pub fn record_delete_failure() {
    counter!("shelfcache_delete_failures_total").increment(1);
}

/// Set the current per-tier sizes.
pub fn set_tier_sizes(
    recent_bytes: usize,
    recent_items: usize,
    aged_bytes: usize,
    aged_items: usize,
) {
    gauge!("shelfcache_tier_bytes", "tier" => "recent").set(recent_bytes as f64);
    gauge!("shelfcache_tier_items", "tier" => "recent").set(recent_items as f64);
    gauge!("shelfcache_tier_bytes", "tier" => "aged").set(aged_bytes as f64);
    gauge!("shelfcache_tier_items", "tier" => "aged").set(aged_items as f64);
}
