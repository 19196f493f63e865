//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Stats Counters ==
/// Cumulative service counters. They survive `clear()`.
#[derive(Debug, Clone, Default)]
pub struct StatsCounters {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (not found or expired)
    pub misses: u64,
    /// Number of entries removed to reclaim capacity
    pub evictions: u64,
    /// Number of entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Stats ==
/// Read-only snapshot of a cache, produced on demand.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Current number of entries
    pub entries: usize,
    /// Configured entry-count ceiling
    pub max_entries: usize,
    /// Current estimated memory usage in bytes
    pub memory_bytes: usize,
    /// Configured memory ceiling, if the cache enforces one
    pub max_memory_bytes: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// hits / (hits + misses), 0.0 before any request
    pub hit_rate: f64,
    /// memory_bytes / entries, 0 when empty
    pub average_entry_bytes: usize,
    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,
}

impl CacheStats {
    /// Builds a snapshot from live counters and occupancy.
    pub fn snapshot(
        counters: &StatsCounters,
        entries: usize,
        max_entries: usize,
        memory_bytes: usize,
        max_memory_bytes: Option<usize>,
    ) -> Self {
        let average_entry_bytes = if entries == 0 {
            0
        } else {
            memory_bytes / entries
        };

        Self {
            entries,
            max_entries,
            memory_bytes,
            max_memory_bytes,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            hit_rate: counters.hit_rate(),
            average_entry_bytes,
            captured_at: Utc::now(),
        }
    }

    /// Fraction of the memory ceiling in use, if there is one.
    pub fn memory_utilization(&self) -> Option<f64> {
        self.max_memory_bytes
            .filter(|max| *max > 0)
            .map(|max| self.memory_bytes as f64 / max as f64)
    }
}

// == Maintenance Report ==
/// What a maintenance pass reclaimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Entries dropped because their TTL elapsed
    pub expired: usize,
    /// Entries evicted to reclaim capacity
    pub evicted: usize,
}

impl MaintenanceReport {
    pub fn total(&self) -> usize {
        self.expired + self.evicted
    }
}
