//! Per-chain head poller driving the read scheduler and the pending
//! transaction tracker.

use std::sync::Arc;

use dapp_multicall::ListenerRegistry;
use dapp_observability::{record_block_observed, record_task_run};
use dapp_transactions::PendingTransactions;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::{ChainRuntime, Engine};

const TASK_NAME: &str = "block_watcher";

pub(crate) struct BlockWatcherTask {
    chain: ChainRuntime,
    listeners: Arc<ListenerRegistry>,
    tracker: Arc<PendingTransactions>,
    last_block: Option<u64>,
}

impl BlockWatcherTask {
    pub(crate) fn new(engine: &Engine, chain: ChainRuntime) -> Self {
        Self {
            chain,
            listeners: Arc::clone(engine.reader().listeners()),
            tracker: Arc::clone(engine.tracker()),
            last_block: None,
        }
    }

    /// Poll for new heads until shutdown. New subscriptions are served at the
    /// current head right away instead of waiting for the next block.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        let chain_id = self.chain.chain_id();
        let mut subscriptions = self.listeners.watch(chain_id);
        let mut poll = tokio::time::interval(self.chain.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(task = TASK_NAME, %chain_id, "Periodic task shutting down");
                    break;
                }
                _ = poll.tick() => self.poll_head().await,
                changed = subscriptions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.refresh_current_block().await;
                }
            }
        }
    }

    #[tracing::instrument(name = "periodic.block_watcher", skip(self), fields(chain_id = %self.chain.chain_id()))]
    async fn poll_head(&mut self) {
        let started = Instant::now();
        let block_number = match self.chain.client().block_number().await {
            Ok(block_number) => block_number,
            Err(error) => {
                record_task_run(TASK_NAME, "error", started.elapsed());
                tracing::warn!(error = %error, "Failed to fetch block number");
                return;
            }
        };

        if self.last_block.is_some_and(|last| block_number <= last) {
            tracing::trace!(block_number, "No new block");
            return;
        }
        self.last_block = Some(block_number);
        record_block_observed(self.chain.chain_id().as_u64(), block_number);

        let (tick, finalized) = tokio::join!(
            self.chain.scheduler().on_block(block_number),
            self.tracker.on_block(self.chain.client().as_ref(), block_number),
        );

        record_task_run(TASK_NAME, "success", started.elapsed());
        tracing::debug!(
            block_number,
            refreshed = tick.requested,
            failed_batches = tick.failed_batches,
            finalized = finalized.len(),
            "Processed new block"
        );
    }

    async fn refresh_current_block(&self) {
        if let Some(block_number) = self.last_block {
            self.chain.scheduler().on_block(block_number).await;
        }
    }
}
