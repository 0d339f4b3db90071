//! Periodic sync scheduler.
//!
//! On each tick the scheduler enumerates all creator configs, loads each
//! one, and launches one reconciliation job per config. Jobs are
//! fire-and-forget with two bounds: a per-creator single-flight guard (a
//! still-running job suppresses a new launch for the same creator) and a
//! bounded job pool, so a slow or hung job cannot accumulate work across
//! ticks. Jobs for different creators run concurrently; a failed job is
//! logged and never affects its siblings or the next tick.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CreatorConfig;
use crate::service::SyncService;

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Maximum reconciliation jobs running at once.
    pub max_concurrent_jobs: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrent_jobs: 4,
        }
    }
}

/// Launches periodic reconciliation jobs for all configured creators.
pub struct SyncScheduler {
    service: SyncService,
    config: SchedulerConfig,
    in_flight: Arc<Mutex<HashSet<String>>>,
    jobs: Arc<Semaphore>,
    shutdown: Arc<AtomicBool>,
}

/// Clears a creator's single-flight reservation when its job ends, whether
/// the job returns or unwinds.
struct InFlightGuard {
    creator: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.creator);
    }
}

impl SyncScheduler {
    /// Create a scheduler over the given service.
    #[must_use]
    pub fn new(service: SyncService, config: SchedulerConfig) -> Self {
        let jobs = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            service,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            jobs,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drive ticks until shutdown is requested.
    ///
    /// The first tick fires immediately; ticks never await the jobs they
    /// launch.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "starting role sync scheduler"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.shutdown.load(Ordering::Relaxed) {
                info!("scheduler shutdown requested, stopping");
                break;
            }
            self.tick().await;
        }
    }

    /// Request graceful shutdown; takes effect at the next tick boundary.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Run one tick: enumerate, load, and launch.
    pub async fn tick(&self) {
        let creators = match self.service.store().list_creators() {
            Ok(creators) => creators,
            Err(e) => {
                error!(error = %e, "failed to enumerate creator configs");
                return;
            }
        };

        debug!(count = creators.len(), "scheduler tick");
        for creator in creators {
            // A malformed config skips only that creator for this tick.
            match self.service.store().load(&creator) {
                Ok(config) => self.launch(config),
                Err(e) => {
                    warn!(creator = %creator, error = %e, "skipping creator with unreadable config");
                }
            }
        }
    }

    /// Number of jobs currently running.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn launch(&self, config: CreatorConfig) {
        let creator = config.creator_name.clone();

        {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(creator.clone()) {
                debug!(creator = %creator, "previous run still in progress, skipping");
                return;
            }
        }
        let guard = InFlightGuard {
            creator: creator.clone(),
            in_flight: Arc::clone(&self.in_flight),
        };

        let permit = match Arc::clone(&self.jobs).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                // Dropping the guard releases the reservation just taken.
                warn!(creator = %creator, "job pool exhausted, deferring to next tick");
                return;
            }
        };

        let service = self.service.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            match service.sync_config(&config).await {
                Ok(report) => {
                    info!(
                        creator = %creator,
                        added = report.roles_added,
                        removed = report.roles_removed,
                        "scheduled reconciliation finished"
                    );
                }
                Err(e) => {
                    error!(creator = %creator, error = %e, "scheduled reconciliation failed");
                }
            }
        });
    }
}
