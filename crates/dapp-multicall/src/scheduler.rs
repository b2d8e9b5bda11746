use std::{sync::Arc, time::Duration};

use alloy::primitives::Bytes;
use dapp_blockchain::{BlockchainError, ChainClient, MulticallBatch};
use dapp_domain::{Call, CallKey, ChainId};
use dapp_observability::{record_multicall_batch, record_multicall_listeners, record_multicall_tick};
use futures::future::join_all;
use tokio::{sync::watch, time::Instant};

use crate::{CallCache, ListenerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Batching,
    AwaitingResult,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Gas budget of one aggregated read.
    pub batch_gas_limit: u64,
    /// Upper bound on a single aggregated read round trip.
    pub batch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_gas_limit: 50_000_000,
            batch_timeout: Duration::from_secs(15),
        }
    }
}

/// Summary of one refresh tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub requested: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Refreshes the listened calls of one chain whenever a block arrives.
///
/// A tick moves `Idle -> Batching -> AwaitingResult -> Idle`. Failed batches
/// leave the cache untouched; the affected calls are picked up again on the
/// next block.
pub struct RefreshScheduler {
    chain_id: ChainId,
    client: Arc<dyn ChainClient>,
    cache: Arc<CallCache>,
    listeners: Arc<ListenerRegistry>,
    config: SchedulerConfig,
    phase: watch::Sender<SchedulerPhase>,
}

impl RefreshScheduler {
    pub fn new(
        client: Arc<dyn ChainClient>,
        cache: Arc<CallCache>,
        listeners: Arc<ListenerRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            chain_id: client.chain_id(),
            client,
            cache,
            listeners,
            config,
            phase: watch::channel(SchedulerPhase::Idle).0,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.borrow()
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.phase.send_replace(phase);
    }

    /// Refresh every listened call that is due at `block_number`.
    #[tracing::instrument(skip(self), fields(chain_id = %self.chain_id))]
    pub async fn on_block(&self, block_number: u64) -> TickOutcome {
        self.cache.observe_block(self.chain_id, block_number);

        let listening = self.listeners.active_keys(self.chain_id);
        record_multicall_listeners(self.chain_id.as_u64(), listening.len());

        let outdated = self
            .cache
            .outdated_keys(self.chain_id, &listening, block_number);
        if outdated.is_empty() {
            return TickOutcome::default();
        }

        self.set_phase(SchedulerPhase::Batching);
        let mut batch = MulticallBatch::with_capacity(outdated.len());
        for key in outdated {
            match key.to_call() {
                Ok(call) => batch.add(key, call),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "Skipping unparseable call key");
                }
            }
        }

        let requested = batch.len();
        let chunks = batch.into_chunks(self.config.batch_gas_limit);
        let keys: Vec<CallKey> = chunks
            .iter()
            .flatten()
            .map(|(key, _)| key.clone())
            .collect();
        self.cache.mark_fetching(self.chain_id, &keys, block_number);

        self.set_phase(SchedulerPhase::AwaitingResult);
        let batches = chunks.len();
        let outcomes = join_all(
            chunks
                .into_iter()
                .map(|chunk| self.fetch_chunk(chunk, block_number)),
        )
        .await;
        self.set_phase(SchedulerPhase::Idle);

        let failed_batches = outcomes.iter().filter(|ok| !**ok).count();
        record_multicall_tick(self.chain_id.as_u64(), requested, batches);
        tracing::debug!(requested, batches, failed_batches, "Refresh tick finished");

        TickOutcome {
            requested,
            batches,
            failed_batches,
        }
    }

    async fn fetch_chunk(&self, chunk: Vec<(CallKey, Call)>, block_number: u64) -> bool {
        let (keys, calls): (Vec<CallKey>, Vec<Call>) = chunk.into_iter().unzip();
        let started = Instant::now();

        let response = match tokio::time::timeout(
            self.config.batch_timeout,
            self.client.aggregate(&calls),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BlockchainError::Timeout {
                method: "multicall_tryBlockAndAggregate",
                timeout_ms: timeout_millis(self.config.batch_timeout),
            }),
        };

        let response = match response {
            Ok(response) if response.results.len() == calls.len() => response,
            Ok(response) => {
                self.fail_chunk(
                    &keys,
                    block_number,
                    started,
                    &BlockchainError::MalformedMulticall {
                        expected: calls.len(),
                        actual: response.results.len(),
                    },
                );
                return false;
            }
            Err(e) => {
                self.fail_chunk(&keys, block_number, started, &e);
                return false;
            }
        };

        let results: Vec<(CallKey, Bytes)> = keys
            .into_iter()
            .zip(response.results)
            .map(|(key, result)| (key, result.into_cached_data()))
            .collect();
        let applied = self
            .cache
            .apply_results(self.chain_id, response.block_number, results);

        record_multicall_batch(
            self.chain_id.as_u64(),
            "success",
            calls.len(),
            started.elapsed(),
        );
        tracing::trace!(
            calls = calls.len(),
            applied,
            result_block = response.block_number,
            "Batch applied"
        );
        true
    }

    fn fail_chunk(
        &self,
        keys: &[CallKey],
        block_number: u64,
        started: Instant,
        error: &BlockchainError,
    ) {
        self.cache.fetch_failed(self.chain_id, keys, block_number);
        record_multicall_batch(self.chain_id.as_u64(), "error", keys.len(), started.elapsed());
        tracing::warn!(
            calls = keys.len(),
            block_number,
            error = %error,
            "Batched read failed; will retry on a later block"
        );
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
