//! Host process for the read aggregation and transaction execution layer.
//!
//! [`run`] loads configuration, connects every enabled chain, and drives one
//! block watcher per chain until SIGINT or SIGTERM. Embedders can build an
//! [`Engine`] directly and drive it themselves.

mod bootstrap;
mod config;
mod engine;
mod error;
mod logger;
mod periodic_tasks;
mod runtime;

use std::sync::Arc;

pub use config::ConfigError;
pub use engine::{ChainRuntime, ChainSettings, Engine};
pub use error::EngineError;

pub async fn run() -> Result<(), EngineError> {
    let config = config::initialize_configuration()?;
    logger::initialize(&config.logger, &config.telemetry);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config::current_env(),
        chains = config.chains.0.len(),
        "Starting dapp engine"
    );

    let engine = Arc::new(bootstrap::build_engine(&config).await?);
    let watched = bootstrap::subscribe_watched_calls(&engine, &config.watch);
    let expiry_interval = bootstrap::expiry_interval(&config.tracker);

    runtime::run(engine, watched, expiry_interval).await
}
