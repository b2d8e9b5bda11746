use std::{sync::Arc, time::Duration};

use tokio::{select, signal::unix::SignalKind};
use tokio_util::sync::CancellationToken;

use super::shutdown;
use crate::{bootstrap::WatchedSubscription, engine::Engine, error::EngineError, periodic_tasks};

/// Run the periodic tasks until SIGINT or SIGTERM, then shut down.
pub(crate) async fn run(
    engine: Arc<Engine>,
    watched: Vec<WatchedSubscription>,
    expiry_interval: Option<Duration>,
) -> Result<(), EngineError> {
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;

    let periodic_shutdown = CancellationToken::new();
    let periodic_handle = tokio::task::spawn(periodic_tasks::run_all(
        Arc::clone(&engine),
        watched,
        expiry_interval,
        periodic_shutdown.clone(),
    ));

    select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, initiating shutdown..."),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating shutdown..."),
    }

    shutdown::graceful_shutdown(shutdown::ShutdownContext {
        engine,
        periodic_shutdown,
        periodic_handle,
    })
    .await;
    Ok(())
}
