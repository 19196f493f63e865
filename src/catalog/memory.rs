//! In-memory catalog backend.
//!
//! Serves a fixed set of located entities. Used by the demo binary and by
//! tests that need to count backend round-trips.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog::{CatalogBackend, CatalogEntity};
use crate::error::Result;
use crate::geo::{Coordinate, Region, Span};

#[derive(Debug)]
pub struct InMemoryCatalog<E> {
    entries: Vec<(Coordinate, E)>,
    entity_fetches: AtomicUsize,
    region_fetches: AtomicUsize,
}

impl<E: CatalogEntity> InMemoryCatalog<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            entity_fetches: AtomicUsize::new(0),
            region_fetches: AtomicUsize::new(0),
        }
    }

    /// Adds an entity located at `location`.
    pub fn insert(&mut self, location: Coordinate, entity: E) {
        self.entries.push((location, entity));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `fetch_entity` calls served so far.
    pub fn entity_fetches(&self) -> usize {
        self.entity_fetches.load(Ordering::Relaxed)
    }

    /// Number of `fetch_entities_in_region` calls served so far.
    pub fn region_fetches(&self) -> usize {
        self.region_fetches.load(Ordering::Relaxed)
    }
}

impl<E: CatalogEntity> Default for InMemoryCatalog<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CatalogEntity> FromIterator<(Coordinate, E)> for InMemoryCatalog<E> {
    fn from_iter<I: IntoIterator<Item = (Coordinate, E)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        catalog.entries.extend(iter);
        catalog
    }
}

impl<E: CatalogEntity> CatalogBackend<E> for InMemoryCatalog<E> {
    async fn fetch_entity(&self, id: &str) -> Result<Option<E>> {
        self.entity_fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .entries
            .iter()
            .find(|(_, entity)| entity.entity_id() == id)
            .map(|(_, entity)| entity.clone()))
    }

    async fn fetch_entities_in_region(&self, center: Coordinate, span: Span) -> Result<Vec<E>> {
        self.region_fetches.fetch_add(1, Ordering::Relaxed);
        let region = Region::new(center, span);
        Ok(self
            .entries
            .iter()
            .filter(|(location, _)| region.contains(location))
            .map(|(_, entity)| entity.clone())
            .collect())
    }
}
