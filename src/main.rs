//! Course Cache - demo driver
//!
//! Runs both cache tiers in front of a synthetic in-memory catalog and
//! drives them with a viewport that drifts across the map, the way a map
//! screen does while the device moves.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_cache::catalog::InMemoryCatalog;
use course_cache::{
    spawn_maintenance_task, spawn_relocation_task, CacheConfig, CachedCatalog, CatalogEntity,
    Coordinate, EntityCache, Region, RegionQueryCache, RelocationPolicy, Span,
};

/// Synthetic catalog entry.
#[derive(Debug, Clone, Serialize)]
struct Course {
    id: String,
    name: String,
    location: Coordinate,
    holes: u8,
    description: String,
}

impl CatalogEntity for Course {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Lays out courses on a regular grid around `origin`.
fn synthetic_catalog(origin: Coordinate, rows: u32, cols: u32, step: f64) -> InMemoryCatalog<Course> {
    (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            let location = Coordinate::new(
                origin.latitude + row as f64 * step,
                origin.longitude + col as f64 * step,
            );
            let course = Course {
                id: format!("course-{}-{}", row, col),
                name: format!("Course {}/{}", row, col),
                location,
                holes: if (row + col) % 3 == 0 { 9 } else { 18 },
                description: "Synthetic course ".repeat(((row + col) % 7 + 1) as usize),
            };
            (location, course)
        })
        .collect()
}

/// Main entry point for the demo driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create both caches and the read-through catalog
/// 4. Start background maintenance and relocation tasks
/// 5. Drift the viewport until SIGINT/SIGTERM, then log final stats
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting course cache demo");

    let config = CacheConfig::from_env();
    config.validate().context("invalid cache configuration")?;
    info!(
        max_entities = config.max_entities,
        max_memory_bytes = config.max_memory_bytes,
        max_regions = config.max_regions,
        region_precision = config.region_precision,
        "Configuration loaded"
    );

    let entities: EntityCache<Course> = EntityCache::new(&config)?;
    let regions: RegionQueryCache<Course> = RegionQueryCache::new(&config)?;

    let origin = Coordinate::new(36.50, -122.00);
    let backend = synthetic_catalog(origin, 40, 40, 0.01);
    info!(courses = backend.len(), "Synthetic catalog ready");
    let catalog = CachedCatalog::with_caches(backend, entities.clone(), regions.clone());

    let maintenance_handle =
        spawn_maintenance_task(entities.clone(), regions.clone(), config.maintenance_interval);
    let (position_tx, position_rx) = watch::channel(origin);
    let relocation_handle = spawn_relocation_task(
        regions.clone(),
        position_rx,
        RelocationPolicy::from_config(&config),
    );

    let span = Span::new(0.05, 0.05);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut step: u64 = 0;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                step += 1;
                // Drift north-east, doubling back every 200 steps
                let phase = (step % 400) as f64;
                let offset = (if phase < 200.0 { phase } else { 400.0 - phase }) * 0.0015;
                let center = Coordinate::new(origin.latitude + offset, origin.longitude + offset);

                if position_tx.send(center).is_err() {
                    warn!("Relocation task stopped listening");
                }

                let visible = catalog.entities_in_region(Region::new(center, span)).await?;
                if let Some(first) = visible.first() {
                    catalog.entity(&first.id).await?;
                }
                debug!(step, visible = visible.len(), "Viewport refreshed");

                if step % 40 == 0 {
                    let stats = catalog.stats();
                    info!(
                        entity_hit_rate = stats.entities.hit_rate,
                        entity_memory_bytes = stats.entities.memory_bytes,
                        regions = stats.regions.entries,
                        region_hit_rate = stats.regions.hit_rate,
                        "Cache stats"
                    );
                }
            }
        }
    }

    maintenance_handle.abort();
    drop(position_tx);
    if let Err(err) = relocation_handle.await {
        warn!(error = %err, "Relocation task ended abnormally");
    }

    let stats = serde_json::to_string_pretty(&catalog.stats())?;
    info!("Final cache stats:\n{}", stats);
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
