//! Size Estimation Module
//!
//! Approximates the memory footprint of cached entities. Estimates rank
//! memory pressure; they are not exact accounting.

use serde::Serialize;

/// Smallest size any entry is accounted at (1 KiB).
pub const MIN_ENTRY_SIZE: usize = 1024;

/// Pluggable estimator signature.
pub type SizeEstimator<E> = fn(&E) -> usize;

/// Estimates an entity's size as the length of its JSON serialization.
///
/// Entities with more fields, longer text or larger nested collections
/// serialize to more bytes, so the estimate grows with them. The result is
/// never below [`MIN_ENTRY_SIZE`]; a value that fails to serialize is
/// accounted at the floor.
pub fn estimate_size<E: Serialize>(entity: &E) -> usize {
    serde_json::to_vec(entity)
        .map(|bytes| bytes.len())
        .unwrap_or(0)
        .max(MIN_ENTRY_SIZE)
}

/// Clamps an arbitrary estimate to the floor.
pub fn clamp_size(estimate: usize) -> usize {
    estimate.max(MIN_ENTRY_SIZE)
}
