// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache entry metadata and the on-disk filename codec.
//!
//! Each admitted payload is described by a [`CacheItem`]: its key, the
//! backend path the payload lives at, the charged size, the caller-supplied
//! item date, and the insertion date. Items are shared between the key index
//! and the retention heaps, so they are reference-counted and immutable
//! apart from the insertion date, which is refreshed in place when a key is
//! re-admitted.
//!
//! The filename codec round-trips `(key, item date)` through a directory
//! listing: `<key>-<date>`, where the date half is a fixed-width 19-byte
//! layout (`%Y%m%dT%H%M%S` plus four digits of 100µs ticks). This is what
//! lets a restart rebuild the index with nothing persisted but the payload
//! files themselves.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::error::CacheError;

/// Strftime layout of the whole-second part of a cache filename's date half.
pub const DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Separates the key from the date half of a filename. Keys must not
/// contain it.
pub(crate) const KEY_SEPARATOR: char = '-';

const DATE_SECONDS_LEN: usize = 15;
const FRACTION_DIGITS: usize = 4;
const NANOS_PER_TICK: u32 = 100_000;

/// Descriptor of one cached entry.
#[derive(Debug)]
pub struct CacheItem {
    key: String,
    file_path: PathBuf,
    size: usize,
    item_date: DateTime<Utc>,
    inserted_at_ms: AtomicI64,
}

impl CacheItem {
    pub(crate) fn new(
        key: impl Into<String>,
        file_path: PathBuf,
        size: usize,
        item_date: DateTime<Utc>,
        inserted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            file_path,
            size,
            item_date,
            inserted_at_ms: AtomicI64::new(inserted_at.timestamp_millis()),
        }
    }

    /// User-visible name, unique across the cache.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Backend path the payload was persisted to.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Charged size in bytes: payload length plus the configured per-item
    /// block overhead.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Intrinsic recency of the payload, supplied by the producer.
    #[must_use]
    pub fn item_date(&self) -> DateTime<Utc> {
        self.item_date
    }

    /// Wall-clock time of admission, at millisecond precision.
    #[must_use]
    pub fn inserted_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.inserted_at_ms.load(Ordering::Acquire))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Refresh the insertion date in place.
    ///
    /// Called when a key is re-admitted while still cached. The heaps are
    /// deliberately not re-sifted; the recent heap's ordering goes stale
    /// with respect to this item until it is next popped.
    pub(crate) fn touch(&self, at: DateTime<Utc>) {
        self.inserted_at_ms.store(at.timestamp_millis(), Ordering::Release);
    }

    pub(crate) fn inserted_at_millis(&self) -> i64 {
        self.inserted_at_ms.load(Ordering::Acquire)
    }
}

impl fmt::Display for CacheItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key: {}, size: {}, item date: {}, inserted at: {}, path: {}",
            self.key,
            self.size,
            self.item_date,
            self.inserted_at(),
            self.file_path.display()
        )
    }
}

/// Format `date` as the fixed-width date half of a cache filename.
#[must_use]
pub fn format_date(date: DateTime<Utc>) -> String {
    let ticks = date.nanosecond() % 1_000_000_000 / NANOS_PER_TICK;
    format!("{}{ticks:0width$}", date.format(DATE_FORMAT), width = FRACTION_DIGITS)
}

/// Build the filename for `key` at `item_date`.
#[must_use]
pub fn file_name(key: &str, item_date: DateTime<Utc>) -> String {
    format!("{key}{KEY_SEPARATOR}{}", format_date(item_date))
}

/// Build the backend path for `key` at `item_date` under `base_path`.
#[must_use]
pub fn file_path(base_path: &Path, key: &str, item_date: DateTime<Utc>) -> PathBuf {
    base_path.join(file_name(key, item_date))
}

/// Split a cache filename back into its key and item date.
///
/// A name that does not split into exactly two parts on `-`, or whose date
/// half does not parse, is a decode error; the startup rebuild treats it as
/// fatal.
pub fn parse_file_name(name: &str) -> Result<(String, DateTime<Utc>), CacheError> {
    let parts: Vec<&str> = name.split(KEY_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(CacheError::FileName {
            name: name.to_owned(),
            reason: format!("expected 2 parts separated by '-', got {}", parts.len()),
        });
    }
    if parts[0].is_empty() {
        return Err(CacheError::FileName {
            name: name.to_owned(),
            reason: "empty key".to_owned(),
        });
    }

    let date = parse_date(parts[1]).map_err(|reason| CacheError::FileName {
        name: name.to_owned(),
        reason,
    })?;

    Ok((parts[0].to_owned(), date))
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let expected = DATE_SECONDS_LEN + FRACTION_DIGITS;
    if s.len() != expected || !s.is_char_boundary(DATE_SECONDS_LEN) {
        return Err(format!("date must be {expected} characters, got {}", s.len()));
    }

    let (seconds, fraction) = s.split_at(DATE_SECONDS_LEN);
    let naive = NaiveDateTime::parse_from_str(seconds, DATE_FORMAT).map_err(|e| e.to_string())?;
    let ticks: u32 = fraction
        .parse()
        .map_err(|_| format!("invalid fractional seconds {fraction:?}"))?;

    naive
        .with_nanosecond(ticks * NANOS_PER_TICK)
        .map(|n| n.and_utc())
        .ok_or_else(|| "fractional seconds out of range".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn a_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap()
            + chrono::Duration::nanoseconds(9_999 * i64::from(NANOS_PER_TICK))
    }

    #[test]
    fn format_is_fixed_width() {
        assert_eq!(format_date(a_date()), "20060102T1504059999");

        let whole = Utc.with_ymd_and_hms(2021, 12, 31, 0, 0, 9).unwrap();
        assert_eq!(format_date(whole), "20211231T0000090000");
    }

    #[test]
    fn file_name_round_trips() {
        let name = file_name("key.0", a_date());
        assert_eq!(name, "key.0-20060102T1504059999");

        let (key, date) = parse_file_name(&name).unwrap();
        assert_eq!(key, "key.0");
        assert_eq!(date, a_date());
    }

    #[test]
    fn file_path_joins_base_directory() {
        let path = file_path(Path::new("/var/cache/blobs"), "key.0", a_date());
        assert_eq!(
            path,
            PathBuf::from("/var/cache/blobs/key.0-20060102T1504059999")
        );
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = parse_file_name("no_separator_here").unwrap_err();
        assert!(matches!(err, CacheError::FileName { .. }));
    }

    #[test]
    fn parse_rejects_extra_separator() {
        let err = parse_file_name("key-with-20060102T1504059999").unwrap_err();
        assert!(matches!(err, CacheError::FileName { .. }));
    }

    #[test]
    fn parse_rejects_short_date() {
        let err = parse_file_name("key.0-20060102T150405").unwrap_err();
        assert!(matches!(err, CacheError::FileName { .. }));
    }

    #[test]
    fn parse_rejects_garbage_date() {
        let err = parse_file_name("key.0-20069999T15040599zz").unwrap_err();
        assert!(matches!(err, CacheError::FileName { .. }));
    }

    #[test]
    fn touch_refreshes_insertion_date_only() {
        let item = CacheItem::new(
            "key.0",
            PathBuf::from("/tmp/key.0-20060102T1504059999"),
            3,
            a_date(),
            a_date(),
        );

        let later = a_date() + chrono::Duration::seconds(42);
        item.touch(later);

        assert_eq!(item.inserted_at(), later);
        assert_eq!(item.item_date(), a_date());
        assert_eq!(item.size(), 3);
    }

    #[test]
    fn display_includes_key_and_path() {
        let item = CacheItem::new(
            "key.0",
            PathBuf::from("/tmp/key.0-20060102T1504059999"),
            3,
            a_date(),
            a_date(),
        );

        let rendered = item.to_string();
        assert!(rendered.contains("key: key.0"));
        assert!(rendered.contains("/tmp/key.0-20060102T1504059999"));
    }
}
