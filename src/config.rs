//! Configuration Module
//!
//! Handles loading, defaulting and validating cache configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::MIN_ENTRY_SIZE;
use crate::error::{CacheError, Result};

// == Defaults ==
/// Default entity-count ceiling
pub const DEFAULT_MAX_ENTITIES: usize = 1000;
/// Default memory ceiling for the entity cache (50 MiB)
pub const DEFAULT_MAX_MEMORY_BYTES: usize = 50 * 1024 * 1024;
/// Default entity TTL in seconds
pub const DEFAULT_ENTITY_TTL_SECS: u64 = 300;
/// Default region TTL in seconds
pub const DEFAULT_REGION_TTL_SECS: u64 = 600;
/// Default region-count ceiling
pub const DEFAULT_MAX_REGIONS: usize = 50;
/// Default quantization precision (3 decimal degrees, about 110 m)
pub const DEFAULT_REGION_PRECISION: u32 = 3;
/// Default number of regions maintenance frees below the ceiling
pub const DEFAULT_REGION_SLACK: usize = 5;
/// Default usage fraction of the memory ceiling that triggers aggressive cleanup
pub const DEFAULT_AGGRESSIVE_THRESHOLD: f64 = 0.5;
/// Default fraction of entries removed by aggressive cleanup
pub const DEFAULT_AGGRESSIVE_FRACTION: f64 = 0.25;
/// Default maintenance interval in seconds
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 60;
/// Default movement (meters) before far regions are invalidated
pub const DEFAULT_RELOCATION_THRESHOLD_M: f64 = 1_000.0;
/// Default radius (meters) of regions kept around the device
pub const DEFAULT_INVALIDATION_DISTANCE_M: f64 = 20_000.0;

/// Largest accepted quantization precision
pub const MAX_REGION_PRECISION: u32 = 9;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entities the entity cache can hold
    pub max_entities: usize,
    /// Memory ceiling in estimated bytes for the entity cache
    pub max_memory_bytes: usize,
    /// Default TTL for entity entries
    pub entity_ttl: Duration,
    /// Default TTL for region entries
    pub region_ttl: Duration,
    /// Maximum number of regions the region cache can hold
    pub max_regions: usize,
    /// Decimal places kept when quantizing region coordinates
    pub region_precision: u32,
    /// Regions freed below the ceiling by a maintenance pass
    pub region_slack: usize,
    /// Usage fraction of `max_memory_bytes` above which maintenance drops rarely used entities
    pub aggressive_threshold: f64,
    /// Fraction of entities dropped by aggressive cleanup
    pub aggressive_fraction: f64,
    /// Interval between background maintenance passes
    pub maintenance_interval: Duration,
    /// Distance the device must move before far regions are invalidated
    pub relocation_threshold_m: f64,
    /// Regions farther than this from the device are invalidated on relocation
    pub invalidation_distance_m: f64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTITIES` - Entity-count ceiling (default: 1000)
    /// - `CACHE_MAX_MEMORY_BYTES` - Entity memory ceiling (default: 52428800)
    /// - `CACHE_ENTITY_TTL` - Entity TTL in seconds (default: 300)
    /// - `CACHE_REGION_TTL` - Region TTL in seconds (default: 600)
    /// - `CACHE_MAX_REGIONS` - Region-count ceiling (default: 50)
    /// - `CACHE_REGION_PRECISION` - Quantization decimal places (default: 3)
    /// - `CACHE_REGION_SLACK` - Maintenance slack below the region ceiling (default: 5)
    /// - `CACHE_AGGRESSIVE_THRESHOLD` - Aggressive cleanup trigger (default: 0.5)
    /// - `CACHE_AGGRESSIVE_FRACTION` - Aggressive cleanup batch (default: 0.25)
    /// - `CACHE_MAINTENANCE_INTERVAL` - Maintenance interval in seconds (default: 60)
    /// - `CACHE_RELOCATION_THRESHOLD_M` - Movement before invalidation (default: 1000)
    /// - `CACHE_INVALIDATION_DISTANCE_M` - Radius of retained regions (default: 20000)
    ///
    /// Unparsable values fall back to their defaults; use [`CacheConfig::validate`]
    /// to reject out-of-range values.
    pub fn from_env() -> Self {
        Self {
            max_entities: env_or("CACHE_MAX_ENTITIES", DEFAULT_MAX_ENTITIES),
            max_memory_bytes: env_or("CACHE_MAX_MEMORY_BYTES", DEFAULT_MAX_MEMORY_BYTES),
            entity_ttl: Duration::from_secs(env_or("CACHE_ENTITY_TTL", DEFAULT_ENTITY_TTL_SECS)),
            region_ttl: Duration::from_secs(env_or("CACHE_REGION_TTL", DEFAULT_REGION_TTL_SECS)),
            max_regions: env_or("CACHE_MAX_REGIONS", DEFAULT_MAX_REGIONS),
            region_precision: env_or("CACHE_REGION_PRECISION", DEFAULT_REGION_PRECISION),
            region_slack: env_or("CACHE_REGION_SLACK", DEFAULT_REGION_SLACK),
            aggressive_threshold: env_or(
                "CACHE_AGGRESSIVE_THRESHOLD",
                DEFAULT_AGGRESSIVE_THRESHOLD,
            ),
            aggressive_fraction: env_or("CACHE_AGGRESSIVE_FRACTION", DEFAULT_AGGRESSIVE_FRACTION),
            maintenance_interval: Duration::from_secs(env_or(
                "CACHE_MAINTENANCE_INTERVAL",
                DEFAULT_MAINTENANCE_INTERVAL_SECS,
            )),
            relocation_threshold_m: env_or(
                "CACHE_RELOCATION_THRESHOLD_M",
                DEFAULT_RELOCATION_THRESHOLD_M,
            ),
            invalidation_distance_m: env_or(
                "CACHE_INVALIDATION_DISTANCE_M",
                DEFAULT_INVALIDATION_DISTANCE_M,
            ),
        }
    }

    // == Validate ==
    /// Rejects configurations that would otherwise degrade into silent
    /// always-evict or never-cache behavior.
    pub fn validate(&self) -> Result<()> {
        if self.max_entities == 0 {
            return Err(CacheError::invalid_config(
                "max_entities must be greater than zero",
            ));
        }
        // Every entry is charged at least MIN_ENTRY_SIZE.
        if self.max_memory_bytes < MIN_ENTRY_SIZE {
            return Err(CacheError::invalid_config(format!(
                "max_memory_bytes must be at least {}",
                MIN_ENTRY_SIZE
            )));
        }
        if self.entity_ttl.is_zero() {
            return Err(CacheError::invalid_config(
                "entity_ttl must be greater than zero",
            ));
        }
        if self.region_ttl.is_zero() {
            return Err(CacheError::invalid_config(
                "region_ttl must be greater than zero",
            ));
        }
        if self.max_regions == 0 {
            return Err(CacheError::invalid_config(
                "max_regions must be greater than zero",
            ));
        }
        if self.region_slack >= self.max_regions {
            return Err(CacheError::invalid_config(
                "region_slack must be less than max_regions",
            ));
        }
        if self.region_precision > MAX_REGION_PRECISION {
            return Err(CacheError::invalid_config(format!(
                "region_precision must be at most {}",
                MAX_REGION_PRECISION
            )));
        }
        if !is_unit_fraction(self.aggressive_threshold) {
            return Err(CacheError::invalid_config(
                "aggressive_threshold must be within (0, 1]",
            ));
        }
        if !is_unit_fraction(self.aggressive_fraction) {
            return Err(CacheError::invalid_config(
                "aggressive_fraction must be within (0, 1]",
            ));
        }
        if self.maintenance_interval.is_zero() {
            return Err(CacheError::invalid_config(
                "maintenance_interval must be greater than zero",
            ));
        }
        if !is_positive_distance(self.relocation_threshold_m) {
            return Err(CacheError::invalid_config(
                "relocation_threshold_m must be a positive distance",
            ));
        }
        if !is_positive_distance(self.invalidation_distance_m) {
            return Err(CacheError::invalid_config(
                "invalidation_distance_m must be a positive distance",
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            entity_ttl: Duration::from_secs(DEFAULT_ENTITY_TTL_SECS),
            region_ttl: Duration::from_secs(DEFAULT_REGION_TTL_SECS),
            max_regions: DEFAULT_MAX_REGIONS,
            region_precision: DEFAULT_REGION_PRECISION,
            region_slack: DEFAULT_REGION_SLACK,
            aggressive_threshold: DEFAULT_AGGRESSIVE_THRESHOLD,
            aggressive_fraction: DEFAULT_AGGRESSIVE_FRACTION,
            maintenance_interval: Duration::from_secs(DEFAULT_MAINTENANCE_INTERVAL_SECS),
            relocation_threshold_m: DEFAULT_RELOCATION_THRESHOLD_M,
            invalidation_distance_m: DEFAULT_INVALIDATION_DISTANCE_M,
        }
    }
}

// == Helpers ==
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn is_unit_fraction(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

fn is_positive_distance(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
