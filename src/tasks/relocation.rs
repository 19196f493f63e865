//! Relocation Task
//!
//! Watches the device position and drops cached regions that fall too far
//! behind once the device has moved a meaningful distance.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RegionQueryCache;
use crate::config::CacheConfig;
use crate::geo::{distance_meters, Coordinate};

/// When and how far to invalidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelocationPolicy {
    /// Movement from the last anchor that triggers invalidation
    pub movement_threshold_m: f64,
    /// Regions farther than this from the new position are dropped
    pub max_distance_m: f64,
}

impl RelocationPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            movement_threshold_m: config.relocation_threshold_m,
            max_distance_m: config.invalidation_distance_m,
        }
    }
}

/// Spawns a task that calls `invalidate_beyond` whenever the watched
/// position has moved at least `movement_threshold_m` from the position of
/// the previous invalidation (initially the channel's current value).
///
/// The task ends when every sender of `positions` is dropped.
pub fn spawn_relocation_task<E>(
    regions: RegionQueryCache<E>,
    mut positions: watch::Receiver<Coordinate>,
    policy: RelocationPolicy,
) -> JoinHandle<()>
where
    E: Clone + Send + 'static,
{
    let mut anchor = *positions.borrow_and_update();

    tokio::spawn(async move {
        while positions.changed().await.is_ok() {
            let position = *positions.borrow_and_update();
            let moved_m = distance_meters(anchor, position);

            if moved_m < policy.movement_threshold_m {
                debug!(moved_m, "Position change below relocation threshold");
                continue;
            }

            let removed = regions.invalidate_beyond(position, policy.max_distance_m);
            info!(
                moved_m,
                removed,
                latitude = position.latitude,
                longitude = position.longitude,
                "Relocated region cache"
            );
            anchor = position;
        }

        debug!("Position channel closed, relocation task exiting");
    })
}
