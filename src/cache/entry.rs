//! Cache Entry Module
//!
//! Defines the per-entry bookkeeping for both cache tiers.

use crate::geo::Region;

// == Cache Entry ==
/// A cached entity with its TTL and access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<E> {
    /// The stored entity
    pub value: E,
    /// Creation timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Number of reads served, starting at 1 on insert
    pub access_count: u64,
    /// Estimated footprint in bytes
    pub estimated_size: usize,
}

impl<E> CacheEntry<E> {
    // == Constructor ==
    /// Creates an entry inserted at `now_ms` that lives for `ttl_ms`.
    pub fn new(value: E, now_ms: u64, ttl_ms: u64, estimated_size: usize) -> Self {
        Self {
            value,
            inserted_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            access_count: 1,
            estimated_size,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time has passed `expires_at`.
    ///
    /// Boundary condition: at exactly `expires_at` the entry is still live.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    /// Records a successful read.
    pub fn record_access(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}

// == Region Cache Entry ==
/// The entity list cached for one quantized viewport.
#[derive(Debug, Clone)]
pub struct RegionCacheEntry<E> {
    /// Entities visible in the region
    pub entities: Vec<E>,
    /// The viewport as originally requested
    pub region: Region,
    /// Creation timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Last successful read (Unix milliseconds), drives eviction
    pub last_accessed_at: u64,
    /// Sum of the entity estimates, for reporting only
    pub estimated_size: usize,
}

impl<E> RegionCacheEntry<E> {
    pub fn new(
        entities: Vec<E>,
        region: Region,
        now_ms: u64,
        ttl_ms: u64,
        estimated_size: usize,
    ) -> Self {
        Self {
            entities,
            region,
            inserted_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            last_accessed_at: now_ms,
            estimated_size,
        }
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed_at = now_ms;
    }
}
