//! Sync service.
//!
//! The single entry point shared by the scheduled and on-demand paths. Both
//! resolve configuration through the same [`ConfigStore`] and run the same
//! [`Reconciler`]; the on-demand path differs only in being awaited by its
//! caller and operating on a single creator.

use std::sync::Arc;

use crate::config::{ConfigStore, CreatorConfig};
use crate::engine::{Reconciler, RunReport};
use crate::error::SyncResult;

/// Shared reconciliation entry point.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<ConfigStore>,
    reconciler: Arc<Reconciler>,
}

impl SyncService {
    /// Create a service over a config store and reconciler.
    #[must_use]
    pub fn new(store: Arc<ConfigStore>, reconciler: Arc<Reconciler>) -> Self {
        Self { store, reconciler }
    }

    /// The config store backing this service.
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Synchronize one creator by case-insensitive name.
    ///
    /// Loads the configuration fresh and runs a full reconciliation,
    /// returning the run's report for presentation to the caller.
    pub async fn sync_creator(&self, creator_name: &str) -> SyncResult<RunReport> {
        let config = self.store.load(creator_name)?;
        self.reconciler.reconcile(&config).await
    }

    /// Run one reconciliation for an already loaded configuration.
    ///
    /// Used by scheduler jobs, which load configs during the tick so a
    /// malformed file can be skipped before a job is spawned.
    pub async fn sync_config(&self, config: &CreatorConfig) -> SyncResult<RunReport> {
        self.reconciler.reconcile(config).await
    }
}
