use std::{future::Future, time::Duration};

use dapp_observability::record_task_run;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Run `run_once` until shutdown, sleeping for the delay each iteration returns.
pub(crate) async fn run_with_shutdown<F, Fut>(
    task_name: &'static str,
    shutdown: CancellationToken,
    mut run_once: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Duration>,
{
    loop {
        let started = Instant::now();
        let delay = run_once().await;
        record_task_run(task_name, "completed", started.elapsed());

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => {
                tracing::info!(task = task_name, "Periodic task shutting down");
                break;
            }
        }
    }
}
