//! Role sync daemon.
//!
//! Runs the periodic reconciliation scheduler over all creator configs, or
//! performs a one-shot sync for a single creator.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rolesync_directory::{RestConfig, RestDirectory};
use rolesync_sync::{
    ConfigStore, Reconciler, ReconcilerConfig, SchedulerConfig, SyncScheduler, SyncService,
};

mod config;

use config::AppConfig;

/// Role sync daemon - mirrors creator server roles into the sync server
#[derive(Parser)]
#[command(name = "rolesyncd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the periodic sync scheduler
    Run,

    /// Synchronize a single creator now and exit
    Sync {
        /// Creator name (case-insensitive, matches the config file name)
        creator: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rolesyncd=debug")),
        )
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    let service = build_service(&config).unwrap_or_else(|e| {
        eprintln!("Startup error: {e}");
        std::process::exit(1);
    });

    match cli.command {
        Commands::Run => run_scheduler(service, &config).await,
        Commands::Sync { creator } => sync_once(service, &creator).await,
    }
}

fn build_service(config: &AppConfig) -> Result<SyncService, rolesync_directory::DirectoryError> {
    let mut rest = RestConfig::new(config.token.clone());
    if let Some(base_url) = &config.api_base_url {
        rest = rest.with_base_url(base_url.clone());
    }
    let directory = Arc::new(RestDirectory::new(rest)?);

    let store = Arc::new(ConfigStore::new(&config.config_dir));
    let reconciler = Arc::new(Reconciler::new(
        directory,
        ReconcilerConfig::new(config.dest_server_id)
            .with_mutation_interval(config.mutation_interval),
    ));

    Ok(SyncService::new(store, reconciler))
}

async fn run_scheduler(service: SyncService, config: &AppConfig) {
    if !config.auto_sync_enabled {
        tracing::warn!("automatic sync is disabled, scheduler will not run");
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
        }
        return;
    }

    tracing::info!(
        dest_server_id = %config.dest_server_id,
        config_dir = %config.config_dir.display(),
        interval_secs = config.sync_interval.as_secs(),
        "starting role sync daemon"
    );

    let scheduler = SyncScheduler::new(
        service,
        SchedulerConfig {
            interval: config.sync_interval,
            max_concurrent_jobs: config.max_concurrent_jobs,
        },
    );

    tokio::select! {
        () = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            if result.is_ok() {
                tracing::info!("shutdown signal received");
            }
            scheduler.shutdown();
        }
    }
}

async fn sync_once(service: SyncService, creator: &str) {
    match service.sync_creator(creator).await {
        Ok(report) => {
            println!("{report}");
        }
        Err(e) => {
            eprintln!("Sync failed for {creator}: {e}");
            std::process::exit(1);
        }
    }
}
