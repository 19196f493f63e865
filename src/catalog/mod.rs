//! Catalog Module
//!
//! Read-through composition of the two cache tiers in front of a catalog
//! backend. The caches never fetch on their own; this layer consults them
//! first and populates them after a backend round-trip.
//!
//! Populating both tiers from one region fetch is not atomic: an
//! interruption between the two writes leaves the caches valid, just
//! less warm.

mod memory;

use std::future::Future;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheStats, EntityCache, MaintenanceReport, RegionQueryCache};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::geo::{Coordinate, Region, Span};

pub use memory::InMemoryCatalog;

/// An entity the catalog can cache.
pub trait CatalogEntity: Clone + Serialize + Send + Sync + 'static {
    /// Stable identifier used as the entity cache key.
    fn entity_id(&self) -> &str;
}

/// Remote source of catalog entities.
pub trait CatalogBackend<E>: Send + Sync {
    /// Fetches one entity by id. `Ok(None)` when the backend has no such entity.
    fn fetch_entity(&self, id: &str) -> impl Future<Output = Result<Option<E>>> + Send;

    /// Fetches every entity visible in the viewport.
    fn fetch_entities_in_region(
        &self,
        center: Coordinate,
        span: Span,
    ) -> impl Future<Output = Result<Vec<E>>> + Send;
}

/// Statistics of both tiers.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub entities: CacheStats,
    pub regions: CacheStats,
}

/// Maintenance outcome of both tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogMaintenance {
    pub entities: MaintenanceReport,
    pub regions: MaintenanceReport,
}

// == Cached Catalog ==
/// Cache-first access to a catalog backend.
#[derive(Debug)]
pub struct CachedCatalog<E, B> {
    backend: B,
    entities: EntityCache<E>,
    regions: RegionQueryCache<E>,
}

impl<E, B> CachedCatalog<E, B>
where
    E: CatalogEntity,
    B: CatalogBackend<E>,
{
    /// Builds both caches from `config` in front of `backend`.
    pub fn new(backend: B, config: &CacheConfig) -> Result<Self> {
        Ok(Self::with_caches(
            backend,
            EntityCache::new(config)?,
            RegionQueryCache::new(config)?,
        ))
    }

    /// Uses caches the caller already owns, e.g. ones shared with
    /// background maintenance tasks.
    pub fn with_caches(backend: B, entities: EntityCache<E>, regions: RegionQueryCache<E>) -> Self {
        Self {
            backend,
            entities,
            regions,
        }
    }

    // == Entity ==
    /// Returns the entity for `id`, fetching and caching it on a miss.
    pub async fn entity(&self, id: &str) -> Result<Option<E>> {
        if let Some(entity) = self.entities.get(id) {
            return Ok(Some(entity));
        }

        debug!(id, "Entity cache miss, fetching from backend");
        let fetched = self.backend.fetch_entity(id).await?;
        if let Some(entity) = &fetched {
            self.entities.put(id, entity.clone(), None);
        }
        Ok(fetched)
    }

    // == Entities In Region ==
    /// Returns the entities visible in `region`, fetching on a miss.
    ///
    /// A fetched list is cached under the region's quantized key and each
    /// entity is also cached individually.
    pub async fn entities_in_region(&self, region: Region) -> Result<Vec<E>> {
        let key = self.regions.key(region.center, region.span);
        if let Some(entities) = self.regions.get(&key) {
            return Ok(entities);
        }

        debug!(key = %key, "Region cache miss, fetching from backend");
        let fetched = self
            .backend
            .fetch_entities_in_region(region.center, region.span)
            .await?;

        for entity in &fetched {
            self.entities
                .put(entity.entity_id().to_string(), entity.clone(), None);
        }
        self.regions.put(key, fetched.clone(), region, None);
        Ok(fetched)
    }

    /// Drops cached regions farther than `max_distance_m` from `position`.
    pub fn relocate(&self, position: Coordinate, max_distance_m: f64) -> usize {
        self.regions.invalidate_beyond(position, max_distance_m)
    }

    /// Runs maintenance on both tiers.
    pub fn maintenance(&self) -> CatalogMaintenance {
        CatalogMaintenance {
            entities: self.entities.maintenance(),
            regions: self.regions.maintenance(),
        }
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            entities: self.entities.stats(),
            regions: self.regions.stats(),
        }
    }

    pub fn entity_cache(&self) -> &EntityCache<E> {
        &self.entities
    }

    pub fn region_cache(&self) -> &RegionQueryCache<E> {
        &self.regions
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
