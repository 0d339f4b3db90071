//! # Role Sync
//!
//! Reconciles role membership between creator-owned source servers and one
//! shared destination server, driven by declarative per-creator mapping
//! files.
//!
//! A reconciliation is one complete pass over a creator's mapping set in two
//! strictly ordered phases:
//!
//! 1. **Cleanup**: every destination member holding a mapped destination
//!    role is checked against the source server; members who lost the source
//!    role (or left the source server entirely) lose the destination role.
//! 2. **Apply**: every source member holding a mapped source role gains the
//!    destination role, if they are present in the destination server and do
//!    not already hold it.
//!
//! All cleanups for all mappings complete before any apply begins, so a role
//! revoked under one mapping can never be reinstated by a stale grant from
//! an overlapping mapping in the same run. Every mutation is idempotent by
//! construction: the engine never re-adds a held role and never removes an
//! absent one, which also makes overlapping runs for the same creator safe.
//!
//! The [`SyncScheduler`] launches one reconciliation job per configured
//! creator on a fixed period; [`SyncService::sync_creator`] is the awaited
//! on-demand path for a single creator. Both drive the same [`Reconciler`].

pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod throttle;

pub use config::{ConfigError, ConfigStore, CreatorConfig, RoleMapping, TEMPLATE_FILE};
pub use engine::{Reconciler, ReconcilerConfig, RunReport};
pub use error::{SyncError, SyncResult};
pub use scheduler::{SchedulerConfig, SyncScheduler};
pub use service::SyncService;
pub use throttle::Throttle;
