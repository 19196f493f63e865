//! Shared Cache Handles
//!
//! Thread-safe handles over the single-owner stores. Each handle holds its
//! store behind one mutex, so every operation runs to completion before the
//! next one on the same cache starts. Operations never await or do I/O, so
//! the lock is never held across a suspension point. The two caches never
//! share or nest locks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::entity::EntityStore;
use crate::cache::region::RegionStore;
use crate::cache::size::SizeEstimator;
use crate::cache::stats::{CacheStats, MaintenanceReport};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::geo::{Coordinate, Region, RegionKey, Span};

// == Entity Cache ==
/// Cloneable, thread-safe id -> entity cache.
#[derive(Debug)]
pub struct EntityCache<E> {
    store: Arc<Mutex<EntityStore<E>>>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: Clone + Serialize> EntityCache<E> {
    /// Creates a cache from validated configuration.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::from_store(EntityStore::with_clock(config, clock)?))
    }
}

impl<E: Clone> EntityCache<E> {
    /// Wraps an already configured store.
    pub fn from_store(store: EntityStore<E>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Replaces the size estimator of the shared store.
    pub fn with_size_estimator(self, estimator: SizeEstimator<E>) -> Self {
        self.store.lock().set_size_estimator(estimator);
        self
    }

    pub fn get(&self, id: &str) -> Option<E> {
        self.store.lock().get(id)
    }

    pub fn put(&self, id: impl Into<String>, entity: E, ttl: Option<Duration>) -> bool {
        self.store.lock().put(id, entity, ttl)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.store.lock().remove(id)
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn maintenance(&self) -> MaintenanceReport {
        self.store.lock().maintenance()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.lock().contains(id)
    }

    /// Access count of the entry for `id`, without counting a read.
    pub fn access_count(&self, id: &str) -> Option<u64> {
        self.store.lock().peek(id).map(|entry| entry.access_count)
    }

    pub fn memory_usage(&self) -> usize {
        self.store.lock().memory_usage()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

// == Region Query Cache ==
/// Cloneable, thread-safe viewport -> entity list cache.
#[derive(Debug)]
pub struct RegionQueryCache<E> {
    store: Arc<Mutex<RegionStore<E>>>,
    precision: u32,
}

impl<E> Clone for RegionQueryCache<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            precision: self.precision,
        }
    }
}

impl<E: Clone + Serialize> RegionQueryCache<E> {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = RegionStore::with_clock(config, clock)?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            precision: config.region_precision,
        })
    }
}

impl<E: Clone> RegionQueryCache<E> {
    /// Quantized key for a viewport. Pure; takes no lock.
    pub fn key(&self, center: Coordinate, span: Span) -> RegionKey {
        RegionKey::quantize(center, span, self.precision)
    }

    pub fn get(&self, key: &RegionKey) -> Option<Vec<E>> {
        self.store.lock().get(key)
    }

    pub fn put(&self, key: RegionKey, entities: Vec<E>, region: Region, ttl: Option<Duration>) {
        self.store.lock().put(key, entities, region, ttl);
    }

    pub fn remove(&self, key: &RegionKey) -> bool {
        self.store.lock().remove(key)
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn invalidate_beyond(&self, reference: Coordinate, max_distance_m: f64) -> usize {
        self.store.lock().invalidate_beyond(reference, max_distance_m)
    }

    pub fn maintenance(&self) -> MaintenanceReport {
        self.store.lock().maintenance()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn contains(&self, key: &RegionKey) -> bool {
        self.store.lock().peek(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}
