//! Course Cache - two-tier in-memory caching for a location-aware catalog
//!
//! An id-keyed entity cache with LRU eviction, TTL expiration and a memory
//! budget, plus a region cache keyed by quantized map viewports with
//! distance-based invalidation.

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod tasks;

pub use cache::{CacheStats, EntityCache, MaintenanceReport, RegionQueryCache};
pub use catalog::{CachedCatalog, CatalogBackend, CatalogEntity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use geo::{Coordinate, Region, RegionKey, Span};
pub use tasks::{spawn_maintenance_task, spawn_relocation_task, RelocationPolicy};
