//! Background Tasks Module
//!
//! Scheduler side of the caches: tasks that drive maintenance and
//! position-based invalidation while the application runs.
//!
//! # Tasks
//! - Maintenance: periodic expiry sweep and memory reclamation on both tiers
//! - Relocation: drops far-away regions when the device moves

mod maintenance;
mod relocation;

pub use maintenance::spawn_maintenance_task;
pub use relocation::{spawn_relocation_task, RelocationPolicy};
