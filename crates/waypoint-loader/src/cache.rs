//! Stale-while-revalidate loader cache
//!
//! Entries are keyed by [`cache_key`](crate::key::cache_key) and carry the
//! timestamps the read policy needs. A read is one of three outcomes: miss
//! (fetch and wait), fresh hit (serve, no fetch), stale hit (serve now,
//! revalidate in the background). Writes overwrite unconditionally; the
//! newest fetch wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

/// One cached loader result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    /// Pathname component of the key, kept for prefix eviction
    pub pathname: String,
    /// When the data was fetched
    pub fetched_at: Instant,
    /// When the entry was last read, driving garbage collection
    pub last_access: Instant,
    /// How long the entry may sit unread before eviction
    pub gc_time: Duration,
}

impl CacheEntry {
    /// Age of the data itself, not of the last read
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.age() >= stale_time
    }
}

/// Outcome of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Nothing cached; the caller must fetch and wait
    Miss,
    /// Cached and within its stale time; serve as-is
    Fresh(Value),
    /// Cached but past its stale time; serve now, revalidate in background
    Stale(Value),
}

/// Read/write statistics, updated atomically
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub stale_hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    /// Fraction of reads served from cache (fresh or stale)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) + self.stale_hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }
}

/// Concurrent loader cache
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use serde_json::json;
/// use waypoint_loader::cache::{CacheLookup, LoaderCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = LoaderCache::new();
/// cache.insert("k".into(), "/users/1".into(), json!({"id": 1}), Duration::from_secs(300));
///
/// match cache.get("k", Duration::from_secs(60)) {
///     CacheLookup::Fresh(data) => assert_eq!(data["id"], 1),
///     other => panic!("expected fresh hit, got {other:?}"),
/// }
/// # }
/// ```
#[derive(Debug, Default)]
pub struct LoaderCache {
    entries: DashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl LoaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an entry under the given stale time, touching its access time
    pub fn get(&self, key: &str, stale_time: Duration) -> CacheLookup {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.last_access = Instant::now();
                if entry.is_stale(stale_time) {
                    self.stats.stale_hits.fetch_add(1, Ordering::Relaxed);
                    CacheLookup::Stale(entry.data.clone())
                } else {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    CacheLookup::Fresh(entry.data.clone())
                }
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Miss
            }
        }
    }

    /// Writes an entry, overwriting whatever is there
    ///
    /// Also sweeps expired entries, so garbage collects without anyone
    /// calling [`sweep`](Self::sweep) on a timer.
    pub fn insert(&self, key: String, pathname: String, data: Value, gc_time: Duration) {
        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                data,
                pathname,
                fetched_at: now,
                last_access: now,
                gc_time,
            },
        );
        self.sweep();
    }

    /// Removes one entry
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Removes every entry whose pathname falls under `prefix`
    ///
    /// Prefix scoping follows layout rules: equality or a `/` boundary.
    pub fn evict_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !path_under_prefix(&entry.pathname, prefix));
        let removed = before.saturating_sub(self.entries.len());
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Removes everything
    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Garbage collection: drops entries unread for longer than their GC time
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_access) < entry.gc_time);
        let removed = before.saturating_sub(self.entries.len());
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Whether `path` equals `prefix` or sits beneath it at a `/` boundary
///
/// The empty prefix covers everything.
pub(crate) fn path_under_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() || prefix == "/" {
        return true;
    }
    path == prefix
        || (path.starts_with(prefix) && path[prefix.len()..].starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_miss_then_fresh_then_stale() {
        let cache = LoaderCache::new();
        let stale_time = Duration::from_secs(1);

        assert_eq!(cache.get("k", stale_time), CacheLookup::Miss);

        cache.insert("k".into(), "/a".into(), json!(1), Duration::from_secs(300));
        assert_eq!(cache.get("k", stale_time), CacheLookup::Fresh(json!(1)));

        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(cache.get("k", stale_time), CacheLookup::Stale(json!(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_stale_time_is_immediately_stale() {
        let cache = LoaderCache::new();
        cache.insert("k".into(), "/a".into(), json!(1), Duration::from_secs(300));
        assert_eq!(cache.get("k", Duration::ZERO), CacheLookup::Stale(json!(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_overwrites() {
        let cache = LoaderCache::new();
        cache.insert("k".into(), "/a".into(), json!(1), Duration::from_secs(300));
        cache.insert("k".into(), "/a".into(), json!(2), Duration::from_secs(300));
        assert_eq!(
            cache.get("k", Duration::from_secs(60)),
            CacheLookup::Fresh(json!(2))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_respects_per_entry_gc_time() {
        let cache = LoaderCache::new();
        cache.insert("short".into(), "/a".into(), json!(1), Duration::from_secs(10));
        cache.insert("long".into(), "/b".into(), json!(2), Duration::from_secs(1_000));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.sweep(), 1);
        assert!(!cache.contains("short"));
        assert!(cache.contains("long"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_refreshes_gc_clock() {
        let cache = LoaderCache::new();
        cache.insert("k".into(), "/a".into(), json!(1), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.get("k", Duration::ZERO);
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.sweep(), 0);
        assert!(cache.contains("k"));
    }

    #[tokio::test]
    async fn test_evict_prefix_boundary() {
        let cache = LoaderCache::new();
        let gc = Duration::from_secs(300);
        cache.insert("a".into(), "/users".into(), json!(1), gc);
        cache.insert("b".into(), "/users/1".into(), json!(2), gc);
        cache.insert("c".into(), "/username".into(), json!(3), gc);

        assert_eq!(cache.evict_prefix("/users"), 2);
        assert!(cache.contains("c"));
    }

    #[tokio::test]
    async fn test_stats_hit_rate() {
        let cache = LoaderCache::new();
        cache.get("missing", Duration::ZERO);
        cache.insert("k".into(), "/a".into(), json!(1), Duration::from_secs(300));
        cache.get("k", Duration::from_secs(60));

        let stats = cache.stats();
        assert_eq!(stats.misses.load(Ordering::Relaxed), 1);
        assert_eq!(stats.hits.load(Ordering::Relaxed), 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
