//! Entity Store Module
//!
//! Id-keyed cache engine combining HashMap storage with LRU tracking, TTL
//! expiration and a memory budget driven by per-entry size estimates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::lru::LruTracker;
use crate::cache::size::{clamp_size, estimate_size, SizeEstimator};
use crate::cache::stats::{CacheStats, MaintenanceReport, StatsCounters};
use crate::clock::{duration_ms, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;

// == Entity Store ==
/// Single-owner entity cache state.
///
/// Operations take `&mut self`; share it through
/// [`EntityCache`](crate::cache::EntityCache) for serialized concurrent access.
pub struct EntityStore<E> {
    /// Id -> entry storage
    entries: HashMap<String, CacheEntry<E>>,
    /// Recency order over the same ids
    lru: LruTracker,
    /// Cumulative counters
    stats: StatsCounters,
    /// Sum of `estimated_size` over all entries
    memory_usage: usize,
    max_entries: usize,
    max_memory_bytes: usize,
    default_ttl: Duration,
    aggressive_threshold: f64,
    aggressive_fraction: f64,
    estimator: SizeEstimator<E>,
    clock: Arc<dyn Clock>,
}

impl<E> fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("entries", &self.entries.len())
            .field("memory_usage", &self.memory_usage)
            .field("max_entries", &self.max_entries)
            .field("max_memory_bytes", &self.max_memory_bytes)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<E: Clone + Serialize> EntityStore<E> {
    // == Constructor ==
    /// Creates a store sized by `config`, reading wall-clock time.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store sized by `config` that reads time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: StatsCounters::new(),
            memory_usage: 0,
            max_entries: config.max_entities,
            max_memory_bytes: config.max_memory_bytes,
            default_ttl: config.entity_ttl,
            aggressive_threshold: config.aggressive_threshold,
            aggressive_fraction: config.aggressive_fraction,
            estimator: estimate_size::<E>,
            clock,
        })
    }
}

impl<E: Clone> EntityStore<E> {
    /// Replaces the JSON-length size estimator. Results are still clamped
    /// to the minimum entry size.
    pub fn with_size_estimator(mut self, estimator: SizeEstimator<E>) -> Self {
        self.set_size_estimator(estimator);
        self
    }

    pub fn set_size_estimator(&mut self, estimator: SizeEstimator<E>) {
        self.estimator = estimator;
    }

    // == Get ==
    /// Retrieves a copy of the entity cached under `id`.
    ///
    /// Expired entries are dropped on sight and counted as misses, never as
    /// evictions. A hit makes `id` the most recently used entry.
    pub fn get(&mut self, id: &str) -> Option<E> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(id) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.detach(id);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!(id, "Dropped expired entity on read");
            return None;
        }

        let value = match self.entries.get_mut(id) {
            Some(entry) => {
                entry.record_access();
                entry.value.clone()
            }
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        self.lru.touch(id);
        self.stats.record_hit();
        Some(value)
    }

    // == Put ==
    /// Stores an entity under `id`, replacing any previous entry.
    ///
    /// When the insert would cross the entry or memory ceiling, expired
    /// entries are swept and least recently used entries are evicted until
    /// at least `max(size, max_memory_bytes / 10)` bytes are free.
    ///
    /// Returns `false` if the entity alone exceeds the memory ceiling; it
    /// is not cached in that case and any previous entry for `id` is dropped.
    ///
    /// # Arguments
    /// * `id` - Stable entity identifier
    /// * `entity` - The value to cache
    /// * `ttl` - Optional TTL (uses the configured entity TTL if None)
    pub fn put(&mut self, id: impl Into<String>, entity: E, ttl: Option<Duration>) -> bool {
        let id = id.into();
        let size = clamp_size((self.estimator)(&entity));

        // The previous entry goes first, even when the new one is rejected.
        self.detach(&id);

        if size > self.max_memory_bytes {
            warn!(
                id = %id,
                size,
                max_memory_bytes = self.max_memory_bytes,
                "Entity exceeds memory ceiling, not cached"
            );
            return false;
        }

        let over_count = self.entries.len() >= self.max_entries;
        let over_memory = self.memory_usage + size > self.max_memory_bytes;
        if over_count || over_memory {
            let target_bytes = if over_memory {
                size.max(self.max_memory_bytes / 10)
            } else {
                0
            };
            let report = self.make_room(target_bytes);
            debug!(
                id = %id,
                expired = report.expired,
                evicted = report.evicted,
                "Reclaimed space for insert"
            );
        }

        let now = self.clock.now_ms();
        let ttl_ms = duration_ms(ttl.unwrap_or(self.default_ttl));
        self.entries
            .insert(id.clone(), CacheEntry::new(entity, now, ttl_ms, size));
        self.lru.touch(&id);
        self.memory_usage += size;
        true
    }

    // == Remove ==
    /// Removes the entry for `id`. Returns whether one was present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.detach(id).is_some()
    }

    // == Clear ==
    /// Drops every entry. Hit, miss, eviction and expiration counters are
    /// cumulative and survive.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.memory_usage = 0;
    }

    // == Maintenance ==
    /// Idle-time cleanup.
    ///
    /// Sweeps expired entries, evicts LRU entries while over either ceiling,
    /// then, if usage is still above `aggressive_threshold` of the memory
    /// ceiling, evicts the `aggressive_fraction` least-accessed entries
    /// regardless of recency. Never run from `put`.
    pub fn maintenance(&mut self) -> MaintenanceReport {
        let mut report = MaintenanceReport {
            expired: self.purge_expired(),
            evicted: 0,
        };

        while self.entries.len() > self.max_entries || self.memory_usage > self.max_memory_bytes
        {
            if self.evict_lru().is_none() {
                break;
            }
            report.evicted += 1;
        }

        let threshold = (self.max_memory_bytes as f64 * self.aggressive_threshold) as usize;
        if self.memory_usage > threshold {
            let before = self.memory_usage;
            let removed = self.evict_least_accessed();
            report.evicted += removed;
            info!(
                removed,
                freed_bytes = before - self.memory_usage,
                memory_bytes = self.memory_usage,
                "Aggressive cleanup evicted least accessed entities"
            );
        }

        report
    }

    // == Stats ==
    /// Returns a statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats::snapshot(
            &self.stats,
            self.entries.len(),
            self.max_entries,
            self.memory_usage,
            Some(self.max_memory_bytes),
        )
    }

    /// Inspects an entry without counting a hit or touching recency.
    pub fn peek(&self, id: &str) -> Option<&CacheEntry<E>> {
        self.entries.get(id)
    }

    /// Whether a live (unexpired) entry exists for `id`. Does not count as a read.
    pub fn contains(&self, id: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(id)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Current estimated memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_bytes
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internals ==
    /// Unlinks an entry from the map, the LRU order and the memory total.
    fn detach(&mut self, id: &str) -> Option<CacheEntry<E>> {
        let entry = self.entries.remove(id)?;
        self.lru.remove(id);
        self.memory_usage -= entry.estimated_size;
        Some(entry)
    }

    /// Removes every expired entry. Returns how many were dropped.
    fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.detach(id);
        }
        self.stats.record_expirations(expired.len());
        expired.len()
    }

    /// Hot-path reclamation: expired sweep, then LRU pops until
    /// `target_bytes` are freed and a slot is open.
    fn make_room(&mut self, target_bytes: usize) -> MaintenanceReport {
        let before = self.memory_usage;
        let mut report = MaintenanceReport {
            expired: self.purge_expired(),
            evicted: 0,
        };

        while before - self.memory_usage < target_bytes || self.entries.len() >= self.max_entries {
            if self.evict_lru().is_none() {
                break;
            }
            report.evicted += 1;
        }

        report
    }

    fn evict_lru(&mut self) -> Option<String> {
        let id = self.lru.pop_oldest()?;
        if let Some(entry) = self.entries.remove(&id) {
            self.memory_usage -= entry.estimated_size;
        }
        self.stats.record_eviction();
        debug!(id = %id, "Evicted least recently used entity");
        Some(id)
    }

    /// Evicts the least-accessed fraction of entries; ties go to the least
    /// recently used.
    fn evict_least_accessed(&mut self) -> usize {
        let mut candidates: Vec<(u64, String)> = self
            .lru
            .iter_oldest_first()
            .filter_map(|id| {
                self.entries
                    .get(id)
                    .map(|entry| (entry.access_count, id.to_string()))
            })
            .collect();
        // Stable sort keeps recency order within equal counts.
        candidates.sort_by_key(|(count, _)| *count);

        let batch = ((candidates.len() as f64 * self.aggressive_fraction) as usize)
            .max(1)
            .min(candidates.len());

        for (_, id) in candidates.into_iter().take(batch) {
            self.detach(&id);
            self.stats.record_eviction();
        }
        batch
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::size::MIN_ENTRY_SIZE;
    use crate::clock::ManualClock;
    use crate::error::CacheError;

    fn config(max_entities: usize, max_memory_bytes: usize) -> CacheConfig {
        CacheConfig {
            max_entities,
            max_memory_bytes,
            entity_ttl: Duration::from_secs(300),
            ..CacheConfig::default()
        }
    }

    fn store(max_entities: usize, max_memory_bytes: usize) -> (EntityStore<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = EntityStore::with_clock(&config(max_entities, max_memory_bytes), clock.clone())
            .unwrap();
        (store, clock)
    }

    #[test]
    fn test_store_new() {
        let (store, _) = store(100, 1 << 20);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.memory_usage(), 0);
    }

    #[test]
    fn test_store_rejects_zero_ceiling() {
        let result = EntityStore::<String>::new(&config(0, 1 << 20));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_store_put_and_get() {
        let (mut store, _) = store(100, 1 << 20);

        assert!(store.put("course-1", "Pebble Beach".to_string(), None));
        assert_eq!(store.get("course-1"), Some("Pebble Beach".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.memory_usage(), MIN_ENTRY_SIZE);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (mut store, _) = store(100, 1 << 20);
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite_does_not_double_count() {
        let (mut store, _) = store(100, 1 << 20);

        store.put("course-1", "x".repeat(3_000), None);
        store.put("course-1", "short".to_string(), None);

        assert_eq!(store.len(), 1);
        assert_eq!(store.memory_usage(), MIN_ENTRY_SIZE);
        assert_eq!(store.get("course-1"), Some("short".to_string()));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_access_count() {
        let (mut store, _) = store(100, 1 << 20);

        store.put("course-1", "a".to_string(), None);
        assert_eq!(store.peek("course-1").unwrap().access_count, 1);

        store.get("course-1");
        store.get("course-1");
        assert_eq!(store.peek("course-1").unwrap().access_count, 3);

        // Re-inserting resets the counter
        store.put("course-1", "b".to_string(), None);
        assert_eq!(store.peek("course-1").unwrap().access_count, 1);
    }

    #[test]
    fn test_store_remove() {
        let (mut store, _) = store(100, 1 << 20);

        store.put("course-1", "a".to_string(), None);
        assert!(store.remove("course-1"));
        assert!(!store.remove("course-1"));

        assert!(store.is_empty());
        assert_eq!(store.memory_usage(), 0);
        assert_eq!(store.get("course-1"), None);
    }

    #[test]
    fn test_store_ttl_expiration_is_not_eviction() {
        let (mut store, clock) = store(100, 1 << 20);

        store.put("course-1", "a".to_string(), Some(Duration::from_secs(1)));

        clock.advance(Duration::from_millis(500));
        assert_eq!(store.get("course-1"), Some("a".to_string()));

        clock.advance(Duration::from_millis(1_000));
        assert_eq!(store.get("course-1"), None);

        let stats = store.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.memory_bytes, 0);
    }

    #[test]
    fn test_store_contains_respects_expiry() {
        let (mut store, clock) = store(100, 1 << 20);

        store.put("course-1", "a".to_string(), Some(Duration::from_secs(1)));
        assert!(store.contains("course-1"));

        clock.advance(Duration::from_secs(2));
        assert!(!store.contains("course-1"));
        // Still physically present until the next read or sweep
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().hits + store.stats().misses, 0);
    }

    #[test]
    fn test_store_lru_eviction_on_count() {
        let (mut store, _) = store(3, 1 << 20);

        store.put("a", "1".to_string(), None);
        store.put("b", "2".to_string(), None);
        store.put("c", "3".to_string(), None);
        store.put("d", "4".to_string(), None);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a"), None);
        assert!(store.get("b").is_some());
        assert!(store.get("c").is_some());
        assert!(store.get("d").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let (mut store, _) = store(3, 1 << 20);

        store.put("a", "1".to_string(), None);
        store.put("b", "2".to_string(), None);
        store.put("c", "3".to_string(), None);
        store.get("a");
        store.put("d", "4".to_string(), None);

        assert!(store.get("a").is_some());
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn test_store_expired_entries_make_room_first() {
        let (mut store, clock) = store(3, 1 << 20);

        store.put("short", "1".to_string(), Some(Duration::from_secs(1)));
        store.put("b", "2".to_string(), None);
        store.put("c", "3".to_string(), None);

        clock.advance(Duration::from_secs(5));
        store.put("d", "4".to_string(), None);

        let stats = store.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
        assert!(store.contains("b"));
        assert!(store.contains("c"));
        assert!(store.contains("d"));
    }

    #[test]
    fn test_store_memory_ceiling_evicts_oldest() {
        let (mut store, _) = store(100, 10 * MIN_ENTRY_SIZE);

        for n in 0..10 {
            store.put(format!("e{}", n), n.to_string(), None);
        }
        assert_eq!(store.memory_usage(), 10 * MIN_ENTRY_SIZE);
        assert_eq!(store.stats().evictions, 0);

        store.put("e10", "10".to_string(), None);
        assert!(store.memory_usage() <= store.max_memory_bytes());
        assert!(!store.contains("e0"));
        assert!(store.contains("e10"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_memory_eviction_frees_a_tenth() {
        let (mut store, _) = store(100, 20 * MIN_ENTRY_SIZE);

        for n in 0..20 {
            store.put(format!("e{}", n), n.to_string(), None);
        }
        store.put("e20", "20".to_string(), None);

        // 10% of 20 KiB is two floor-sized entries
        assert_eq!(store.stats().evictions, 2);
        assert!(!store.contains("e0"));
        assert!(!store.contains("e1"));
        assert!(store.contains("e2"));
        assert_eq!(store.len(), 19);
    }

    #[test]
    fn test_store_large_entity_evicts_enough() {
        let (mut store, _) = store(100, 10 * MIN_ENTRY_SIZE);

        for n in 0..10 {
            store.put(format!("e{}", n), n.to_string(), None);
        }
        // About 4 KiB once serialized
        store.put("big", "x".repeat(4 * MIN_ENTRY_SIZE - 100), None);

        assert!(store.memory_usage() <= store.max_memory_bytes());
        assert_eq!(store.stats().evictions, 4);
        assert!(store.contains("big"));
    }

    #[test]
    fn test_store_rejects_entity_over_ceiling() {
        let (mut store, _) = store(100, 2 * MIN_ENTRY_SIZE);

        store.put("small", "a".to_string(), None);
        assert!(!store.put("huge", "x".repeat(3 * MIN_ENTRY_SIZE), None));

        assert!(!store.contains("huge"));
        assert!(store.contains("small"));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_rejected_overwrite_drops_stale_value() {
        let (mut store, _) = store(100, 2 * MIN_ENTRY_SIZE);

        assert!(store.put("course", "v1".to_string(), None));
        assert!(!store.put("course", "x".repeat(4 * MIN_ENTRY_SIZE), None));

        assert_eq!(store.get("course"), None);
        assert!(store.is_empty());
        assert_eq!(store.memory_usage(), 0);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_custom_estimator() {
        let (store, _) = store(100, 1 << 20);
        let mut store = store.with_size_estimator(|value: &String| value.len() * 10);

        store.put("a", "x".repeat(500), None);
        assert_eq!(store.memory_usage(), 5_000);

        // Zero estimates are clamped to the floor
        store.put("b", String::new(), None);
        assert_eq!(store.memory_usage(), 5_000 + MIN_ENTRY_SIZE);
    }

    #[test]
    fn test_store_clear_keeps_counters() {
        let (mut store, _) = store(2, 1 << 20);

        store.put("a", "1".to_string(), None);
        store.put("b", "2".to_string(), None);
        store.put("c", "3".to_string(), None);
        store.get("b");
        store.get("missing");

        store.clear();

        let stats = store.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.memory_bytes, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn test_maintenance_sweeps_expired() {
        let (mut store, clock) = store(100, 1 << 20);

        store.put("a", "1".to_string(), Some(Duration::from_secs(1)));
        store.put("b", "2".to_string(), Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(2));
        let report = store.maintenance();

        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(store.len(), 1);
        assert!(store.contains("b"));
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_maintenance_aggressive_cleanup_prefers_frequency() {
        let (mut store, _) = store(100, 10 * MIN_ENTRY_SIZE);

        for n in 0..6 {
            let id = format!("e{}", n);
            store.put(id.clone(), n.to_string(), None);
            store.get(&id);
            store.get(&id);
        }
        // Most recent but least accessed
        store.put("e6", "6".to_string(), None);
        store.put("e7", "7".to_string(), None);

        // 8 KiB is above half of the 10 KiB ceiling
        let report = store.maintenance();

        assert_eq!(report.expired, 0);
        assert_eq!(report.evicted, 2);
        assert!(!store.contains("e6"));
        assert!(!store.contains("e7"));
        assert!(store.contains("e0"));
        assert_eq!(store.len(), 6);
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_maintenance_skips_aggressive_below_threshold() {
        let (mut store, _) = store(100, 10 * MIN_ENTRY_SIZE);

        for n in 0..5 {
            store.put(format!("e{}", n), n.to_string(), None);
        }

        // Exactly half the ceiling is not above the threshold
        let report = store.maintenance();
        assert_eq!(report, MaintenanceReport::default());
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_maintenance_removes_at_least_one() {
        let (mut store, _) = store(100, 3 * MIN_ENTRY_SIZE);

        store.put("a", "1".to_string(), None);
        store.put("b", "2".to_string(), None);

        // A quarter of two entries rounds down to zero; one still goes
        let report = store.maintenance();
        assert_eq!(report.evicted, 1);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_put_never_runs_aggressive_cleanup() {
        let (mut store, _) = store(100, 10 * MIN_ENTRY_SIZE);

        for n in 0..9 {
            store.put(format!("e{}", n), n.to_string(), None);
        }
        assert_eq!(store.len(), 9);
        assert_eq!(store.stats().evictions, 0);
    }
}
