//! # Landlord API Main Entry Point
//!
//! This is the main entry point for the Landlord API service.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use landlord::config::ConfigLoader;
use landlord::db::init_pool;
use landlord::migration::{Migrator, MigratorTrait};
use landlord::provisioning::ProvisioningService;
use landlord::repositories::ProvisioningJobRepository;
use landlord::seeds::seed_default_plans;
use landlord::server::{AppState, run_server};
use landlord::telemetry::init_tracing;
use landlord::worker::Provisioner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = Arc::new(config_loader.load()?);

    init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    if config.profile == "local" {
        seed_default_plans(&db).await?;
    }

    let state = AppState::new(Arc::clone(&config), db.clone());

    // Background provisioner drains the provisioning_jobs queue.
    let shutdown = CancellationToken::new();
    let provisioner = Provisioner::new(
        Arc::clone(&config),
        Arc::new(ProvisioningService::new(db.clone(), Arc::clone(&config))),
        ProvisioningJobRepository::new(db),
    );
    let provisioner_shutdown = shutdown.clone();
    let provisioner_handle = tokio::spawn(async move {
        if let Err(e) = provisioner.run(provisioner_shutdown).await {
            tracing::error!(error = ?e, "Provisioner exited with error");
        }
    });

    let result = run_server(state).await;

    shutdown.cancel();
    let _ = provisioner_handle.await;

    result
}
