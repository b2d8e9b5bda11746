use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dapp_transactions::PendingTransactions;
use tokio_util::sync::CancellationToken;

use crate::periodic_tasks::runner::run_with_shutdown;

/// Drops unconfirmed transactions past the tracker's TTL.
pub(crate) struct PendingExpiryTask {
    tracker: Arc<PendingTransactions>,
    interval: Duration,
}

impl PendingExpiryTask {
    pub(crate) fn new(tracker: Arc<PendingTransactions>, interval: Duration) -> Self {
        Self { tracker, interval }
    }

    pub(crate) async fn run(self, shutdown: CancellationToken) {
        run_with_shutdown("pending_expiry", shutdown, || self.execute()).await;
    }

    async fn execute(&self) -> Duration {
        let expired = self.tracker.expire_unconfirmed(Utc::now());
        if !expired.is_empty() {
            tracing::info!(expired = expired.len(), "Expired unconfirmed transactions");
        }
        self.interval
    }
}
