//! Maintenance Task
//!
//! Background task that periodically reclaims memory in both cache tiers.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{EntityCache, RegionQueryCache};

/// Spawns a background task that runs `maintenance()` on both caches.
///
/// The task sleeps for `interval` between passes. Each pass takes each
/// cache's lock in turn, never both at once.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_maintenance_task(entities.clone(), regions.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_maintenance_task<E>(
    entities: EntityCache<E>,
    regions: RegionQueryCache<E>,
    interval: Duration,
) -> JoinHandle<()>
where
    E: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting cache maintenance task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let entity_report = entities.maintenance();
            let region_report = regions.maintenance();

            if entity_report.total() + region_report.total() > 0 {
                info!(
                    entities_expired = entity_report.expired,
                    entities_evicted = entity_report.evicted,
                    regions_expired = region_report.expired,
                    regions_evicted = region_report.evicted,
                    "Cache maintenance reclaimed entries"
                );
            } else {
                debug!("Cache maintenance: nothing to reclaim");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::geo::{Coordinate, Region, Span};

    fn caches(clock: Arc<ManualClock>) -> (EntityCache<String>, RegionQueryCache<String>) {
        let config = CacheConfig::default();
        (
            EntityCache::with_clock(&config, clock.clone()).unwrap(),
            RegionQueryCache::with_clock(&config, clock).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_maintenance_task_removes_expired_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let (entities, regions) = caches(clock.clone());

        entities.put("expire_soon", "value".to_string(), Some(Duration::from_secs(1)));
        entities.put("long_lived", "value".to_string(), Some(Duration::from_secs(3600)));
        let region = Region::new(Coordinate::new(1.0, 1.0), Span::new(0.1, 0.1));
        let key = regions.key(region.center, region.span);
        regions.put(key.clone(), vec![], region, Some(Duration::from_secs(1)));

        clock.advance(Duration::from_secs(2));
        let handle = spawn_maintenance_task(
            entities.clone(),
            regions.clone(),
            Duration::from_millis(20),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Swept without any read touching them
        assert_eq!(entities.len(), 1);
        assert!(entities.contains("long_lived"));
        assert!(!regions.contains(&key));
        assert_eq!(entities.stats().expirations, 1);
        assert_eq!(entities.stats().misses, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_maintenance_task_can_be_aborted() {
        let clock = Arc::new(ManualClock::new(0));
        let (entities, regions) = caches(clock);

        let handle = spawn_maintenance_task(entities, regions, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
