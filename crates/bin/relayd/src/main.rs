//! # relayd: relay daemon
//!
//! Composition root that wires storage and integrations together and runs
//! the polling engine until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Register the enabled integrations
//! - Boot the poller supervisor for every enabled unit
//! - Stop every poller on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use relay_adapter_microsoft::MicrosoftIntegration;
use relay_adapter_spotify::SpotifyIntegration;
use relay_adapter_storage_sqlite_sqlx::{SqliteCredentialStore, SqliteUnitRepository};
use relay_adapter_timer::TimerIntegration;
use relay_adapter_virtual::VirtualIntegration;
use relay_adapter_weather::WeatherIntegration;
use relay_app::registry::CapabilityRegistry;
use relay_app::supervisor::PollerSupervisor;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = relay_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let unit_repo = Arc::new(SqliteUnitRepository::new(pool.clone()));
    let credentials = Arc::new(SqliteCredentialStore::new(pool));

    // Engine
    let registry = Arc::new(build_registry(&config)?);
    for service in registry.services() {
        tracing::info!(service = %service.name, "integration registered");
    }
    let supervisor = PollerSupervisor::new(
        registry,
        unit_repo,
        credentials,
        config.engine_settings(),
    );
    let report = supervisor.boot().await?;
    tracing::info!(
        started = report.started.len(),
        failed = report.failed.len(),
        "relayd running"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    supervisor.shutdown().await;

    Ok(())
}

fn build_registry(config: &Config) -> Result<CapabilityRegistry, Box<dyn std::error::Error>> {
    let mut builder = CapabilityRegistry::builder();
    if config.integrations.virtual_enabled {
        builder = builder.integration(&VirtualIntegration::default());
    }
    if config.integrations.timer_enabled {
        builder = builder.integration(&TimerIntegration::default());
    }
    if let Some(weather) = config.weather_config() {
        builder = builder.integration(&WeatherIntegration::new(weather)?);
    }
    if let Some(spotify) = config.spotify_config() {
        builder = builder.integration(&SpotifyIntegration::new(spotify)?);
    }
    if let Some(microsoft) = config.microsoft_config() {
        builder = builder.integration(&MicrosoftIntegration::new(microsoft)?);
    }
    Ok(builder.build()?)
}
