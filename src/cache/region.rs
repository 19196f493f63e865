//! Region Store Module
//!
//! Caches entity lists per quantized map viewport. Region entries are few
//! and coarse, so eviction compares last-access timestamps instead of
//! keeping an ordered recency list.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::entry::RegionCacheEntry;
use crate::cache::size::{clamp_size, estimate_size, SizeEstimator};
use crate::cache::stats::{CacheStats, MaintenanceReport, StatsCounters};
use crate::clock::{duration_ms, Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::geo::{distance_meters, Coordinate, Region, RegionKey, Span};

// == Region Store ==
/// Single-owner region cache state.
pub struct RegionStore<E> {
    entries: HashMap<RegionKey, RegionCacheEntry<E>>,
    stats: StatsCounters,
    max_regions: usize,
    default_ttl: Duration,
    precision: u32,
    slack: usize,
    estimator: SizeEstimator<E>,
    clock: Arc<dyn Clock>,
}

impl<E> fmt::Debug for RegionStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionStore")
            .field("regions", &self.entries.len())
            .field("max_regions", &self.max_regions)
            .field("precision", &self.precision)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<E: Clone + Serialize> RegionStore<E> {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            entries: HashMap::new(),
            stats: StatsCounters::new(),
            max_regions: config.max_regions,
            default_ttl: config.region_ttl,
            precision: config.region_precision,
            slack: config.region_slack,
            estimator: estimate_size::<E>,
            clock,
        })
    }
}

impl<E: Clone> RegionStore<E> {
    /// Replaces the per-entity size estimator used for reporting.
    pub fn with_size_estimator(mut self, estimator: SizeEstimator<E>) -> Self {
        self.set_size_estimator(estimator);
        self
    }

    pub fn set_size_estimator(&mut self, estimator: SizeEstimator<E>) {
        self.estimator = estimator;
    }

    // == Key ==
    /// Quantized key for a viewport at the configured precision.
    pub fn key(&self, center: Coordinate, span: Span) -> RegionKey {
        RegionKey::quantize(center, span, self.precision)
    }

    // == Get ==
    /// Retrieves a copy of the entities cached for `key`.
    ///
    /// Expired regions are dropped on sight and counted as misses. A hit
    /// refreshes the region's last-access time.
    pub fn get(&mut self, key: &RegionKey) -> Option<Vec<E>> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!(key = %key, "Dropped expired region on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        let entities = entry.entities.clone();
        self.stats.record_hit();
        Some(entities)
    }

    // == Put ==
    /// Stores the entities visible in `region` under `key`.
    ///
    /// A new key arriving at the region ceiling evicts the single region
    /// with the oldest last access. Replacing an existing key never evicts.
    pub fn put(&mut self, key: RegionKey, entities: Vec<E>, region: Region, ttl: Option<Duration>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_regions {
            self.evict_oldest_accessed();
        }

        let now = self.clock.now_ms();
        let ttl_ms = duration_ms(ttl.unwrap_or(self.default_ttl));
        let estimated_size: usize = entities
            .iter()
            .map(|entity| clamp_size((self.estimator)(entity)))
            .sum();

        debug!(key = %key, count = entities.len(), "Cached region");
        self.entries.insert(
            key,
            RegionCacheEntry::new(entities, region, now, ttl_ms, estimated_size),
        );
    }

    // == Remove ==
    pub fn remove(&mut self, key: &RegionKey) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Drops every region; counters survive.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Invalidate Beyond ==
    /// Removes every region whose center is farther than `max_distance_m`
    /// meters from `reference`. Returns how many were removed.
    ///
    /// Proactive reclamation as the device moves; not counted as eviction.
    pub fn invalidate_beyond(&mut self, reference: Coordinate, max_distance_m: f64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| distance_meters(reference, entry.region.center) <= max_distance_m);
        let removed = before - self.entries.len();

        if removed > 0 {
            info!(
                removed,
                remaining = self.entries.len(),
                max_distance_m,
                "Invalidated distant regions"
            );
        }
        removed
    }

    // == Maintenance ==
    /// Sweeps expired regions, then, if still above the ceiling, evicts the
    /// least recently accessed down to `max_regions - slack`.
    pub fn maintenance(&mut self) -> MaintenanceReport {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let expired = before - self.entries.len();
        self.stats.record_expirations(expired);

        let mut evicted = 0;
        if self.entries.len() > self.max_regions {
            let target = self.max_regions.saturating_sub(self.slack);
            while self.entries.len() > target {
                if !self.evict_oldest_accessed() {
                    break;
                }
                evicted += 1;
            }
        }

        MaintenanceReport { expired, evicted }
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let memory_bytes: usize = self.entries.values().map(|entry| entry.estimated_size).sum();
        CacheStats::snapshot(
            &self.stats,
            self.entries.len(),
            self.max_regions,
            memory_bytes,
            None,
        )
    }

    /// Inspects a region without counting a hit or refreshing its access time.
    pub fn peek(&self, key: &RegionKey) -> Option<&RegionCacheEntry<E>> {
        self.entries.get(key)
    }

    /// Keys of all stored regions, expired ones included.
    pub fn keys(&self) -> Vec<RegionKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest_accessed(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(key, entry)| (entry.last_accessed_at, entry.inserted_at, *key))
            .map(|(key, _)| key.clone());

        match oldest {
            Some(key) => {
                self.entries.remove(&key);
                self.stats.record_eviction();
                debug!(key = %key, "Evicted least recently accessed region");
                true
            }
            None => false,
        }
    }
}
