use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::Engine;

const PERIODIC_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);

pub(super) struct ShutdownContext {
    pub(super) engine: Arc<Engine>,
    pub(super) periodic_shutdown: CancellationToken,
    pub(super) periodic_handle: JoinHandle<()>,
}

pub(super) async fn graceful_shutdown(context: ShutdownContext) {
    // 1. Cancel periodic tasks; block watchers finish their current tick.
    // 2. Wait for them, aborting after the timeout.
    // 3. Report transactions that never confirmed.
    let ShutdownContext {
        engine,
        periodic_shutdown,
        mut periodic_handle,
    } = context;

    tracing::info!("Shutting down gracefully...");

    periodic_shutdown.cancel();
    wait_for_shutdown_task(
        "periodic_tasks",
        PERIODIC_SHUTDOWN_TIMEOUT,
        &mut periodic_handle,
    )
    .await;

    for chain in engine.chains() {
        let pending = engine.tracker().pending(chain.chain_id());
        if !pending.is_empty() {
            tracing::warn!(
                chain_id = %chain.chain_id(),
                pending = pending.len(),
                "Exiting with unconfirmed transactions"
            );
        }
    }

    tracing::info!("Shutdown complete");
}

async fn wait_for_shutdown_task(
    task: &str,
    timeout: Duration,
    handle: &mut JoinHandle<()>,
) {
    match tokio::time::timeout(timeout, &mut *handle).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::error!(
            task,
            error = ?error,
            "Shutdown task panicked"
        ),
        Err(_) => {
            tracing::warn!(
                task,
                timeout_secs = timeout.as_secs(),
                "Shutdown timeout reached, aborting task"
            );
            handle.abort();
            let _ = handle.await;
        }
    }
}
