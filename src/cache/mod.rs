//! Cache Module
//!
//! Two in-memory tiers: an id-keyed entity cache with LRU eviction, TTL
//! expiration and a memory budget, and a region cache keyed by quantized
//! map viewports.

mod entity;
mod entry;
mod lru;
mod region;
mod shared;
mod size;
mod stats;


// Re-export public types
pub use entity::EntityStore;
pub use entry::{CacheEntry, RegionCacheEntry};
pub use lru::LruTracker;
pub use region::RegionStore;
pub use shared::{EntityCache, RegionQueryCache};
pub use size::{clamp_size, estimate_size, SizeEstimator, MIN_ENTRY_SIZE};
pub use stats::{CacheStats, MaintenanceReport, StatsCounters};
