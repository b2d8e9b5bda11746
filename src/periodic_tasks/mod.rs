mod runner;
pub(crate) mod tasks;

use std::{sync::Arc, time::Duration};

use tasks::{
    block_watcher::BlockWatcherTask, pending_expiry::PendingExpiryTask,
    watched_calls::WatchedCallsTask,
};
use tokio_util::sync::CancellationToken;

use crate::{bootstrap::WatchedSubscription, engine::Engine};

/// Spawn all periodic tasks and wait for them to complete.
///
/// One block watcher runs per chain. Uses `JoinSet` to log panics as they
/// happen rather than once every task has finished. Under normal operation,
/// tasks only exit during shutdown.
pub(crate) async fn run_all(
    engine: Arc<Engine>,
    watched: Vec<WatchedSubscription>,
    expiry_interval: Option<Duration>,
    shutdown: CancellationToken,
) {
    let mut set = tokio::task::JoinSet::new();

    for chain in engine.chains() {
        let task = BlockWatcherTask::new(&engine, chain.clone());
        set.spawn(task.run(shutdown.clone()));
    }

    for subscription in watched {
        set.spawn(WatchedCallsTask::new(subscription).run(shutdown.clone()));
    }

    if let Some(interval) = expiry_interval {
        let task = PendingExpiryTask::new(Arc::clone(engine.tracker()), interval);
        set.spawn(task.run(shutdown.clone()));
    }

    while let Some(result) = set.join_next().await {
        match result {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                tracing::error!(error = ?e, "Periodic task panicked");
            }
            Err(e) => {
                tracing::error!(error = ?e, "Periodic task failed");
            }
        }
    }
}
