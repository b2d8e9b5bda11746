use std::{collections::BTreeMap, sync::Arc, time::Duration};

use dapp_blockchain::{ChainClient, ChainConfig};
use dapp_domain::ChainId;
use dapp_multicall::{
    CallCache, ChainReader, ListenerOptions, ListenerRegistry, RefreshScheduler, SchedulerConfig,
};
use dapp_transactions::{PendingTransactions, TransactionExecutor};

/// Per-chain tunables the engine needs once a client exists.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub scheduler: SchedulerConfig,
    pub poll_interval: Duration,
    pub blocks_per_fetch: u64,
    pub gas_margin_bps: u64,
}

impl From<&ChainConfig> for ChainSettings {
    fn from(config: &ChainConfig) -> Self {
        Self {
            scheduler: SchedulerConfig {
                batch_gas_limit: config.batch_gas_limit,
                batch_timeout: config.batch_timeout,
            },
            poll_interval: config.poll_interval,
            blocks_per_fetch: config.blocks_per_fetch,
            gas_margin_bps: config.gas_margin_bps,
        }
    }
}

/// Everything bound to one chain.
#[derive(Clone)]
pub struct ChainRuntime {
    client: Arc<dyn ChainClient>,
    scheduler: Arc<RefreshScheduler>,
    executor: Arc<TransactionExecutor>,
    settings: ChainSettings,
}

impl ChainRuntime {
    pub fn chain_id(&self) -> ChainId {
        self.client.chain_id()
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub fn scheduler(&self) -> &Arc<RefreshScheduler> {
        &self.scheduler
    }

    pub fn executor(&self) -> &Arc<TransactionExecutor> {
        &self.executor
    }

    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }

    /// Listener options using the chain's configured cadence.
    pub fn default_options(&self) -> ListenerOptions {
        ListenerOptions::every(self.settings.blocks_per_fetch)
    }
}

/// Shared read cache, listener registry and pending-transaction tracker,
/// plus one [`ChainRuntime`] per configured chain.
pub struct Engine {
    reader: ChainReader,
    tracker: Arc<PendingTransactions>,
    chains: BTreeMap<ChainId, ChainRuntime>,
}

impl Engine {
    pub fn new(tracker: Arc<PendingTransactions>) -> Self {
        Self {
            reader: ChainReader::new(Arc::new(CallCache::new()), ListenerRegistry::new()),
            tracker,
            chains: BTreeMap::new(),
        }
    }

    /// Register a chain. A second client for the same chain id replaces the first.
    pub fn add_chain(&mut self, client: Arc<dyn ChainClient>, settings: ChainSettings) -> &ChainRuntime {
        let chain_id = client.chain_id();
        let scheduler = Arc::new(RefreshScheduler::new(
            Arc::clone(&client),
            Arc::clone(self.reader.cache()),
            Arc::clone(self.reader.listeners()),
            settings.scheduler.clone(),
        ));
        let executor = Arc::new(
            TransactionExecutor::new(Arc::clone(&client), Arc::clone(&self.tracker))
                .with_gas_margin_bps(settings.gas_margin_bps),
        );

        self.chains.insert(
            chain_id,
            ChainRuntime {
                client,
                scheduler,
                executor,
                settings,
            },
        );
        &self.chains[&chain_id]
    }

    pub fn reader(&self) -> &ChainReader {
        &self.reader
    }

    pub fn tracker(&self) -> &Arc<PendingTransactions> {
        &self.tracker
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainRuntime> {
        self.chains.get(&chain_id)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainRuntime> {
        self.chains.values()
    }

    pub fn executor(&self, chain_id: ChainId) -> Option<&Arc<TransactionExecutor>> {
        self.chain(chain_id).map(ChainRuntime::executor)
    }

    /// Forget cached reads and tracked transactions of a chain.
    pub fn clear_chain(&self, chain_id: ChainId) {
        self.reader.clear_chain(chain_id);
        self.tracker.clear_chain(chain_id);
        tracing::info!(%chain_id, "Cleared cached reads and tracked transactions");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::{Address, B256, Bytes};
    use async_trait::async_trait;
    use dapp_blockchain::{BlockchainError, MulticallResponse, MulticallResult};
    use dapp_domain::{Call, TransactionInfo, TransactionKind, TxHash, TxPayload, TxReceipt};

    use super::*;

    struct StubChain(ChainId);

    #[async_trait]
    impl ChainClient for StubChain {
        fn chain_id(&self) -> ChainId {
            self.0
        }

        async fn block_number(&self) -> Result<u64, BlockchainError> {
            Ok(1)
        }

        async fn aggregate(&self, calls: &[Call]) -> Result<MulticallResponse, BlockchainError> {
            Ok(MulticallResponse {
                block_number: 1,
                results: calls
                    .iter()
                    .map(|_| MulticallResult::success(vec![0u8; 32]))
                    .collect(),
            })
        }

        async fn estimate_gas(&self, _payload: &TxPayload) -> Result<u64, BlockchainError> {
            Ok(50_000)
        }

        async fn simulate(&self, _payload: &TxPayload) -> Result<Bytes, BlockchainError> {
            Ok(Bytes::new())
        }

        async fn send_transaction(
            &self,
            _payload: &TxPayload,
            _gas_limit: u64,
        ) -> Result<TxHash, BlockchainError> {
            Ok(B256::with_last_byte(1))
        }

        async fn transaction_receipt(
            &self,
            _hash: TxHash,
        ) -> Result<Option<TxReceipt>, BlockchainError> {
            Ok(None)
        }
    }

    fn settings() -> ChainSettings {
        ChainSettings {
            scheduler: SchedulerConfig::default(),
            poll_interval: Duration::from_secs(1),
            blocks_per_fetch: 2,
            gas_margin_bps: 1_000,
        }
    }

    #[tokio::test]
    async fn chains_share_the_cache_and_tracker() {
        let mut engine = Engine::new(Arc::new(PendingTransactions::new()));
        engine.add_chain(Arc::new(StubChain(ChainId::new(1))), settings());
        engine.add_chain(Arc::new(StubChain(ChainId::new(10))), settings());

        let mainnet = engine.chain(ChainId::new(1)).unwrap();
        assert_eq!(mainnet.default_options().blocks_per_fetch(), 2);

        let handle = engine.reader().subscribe_calls(
            ChainId::new(1),
            [Some(Call::new(Address::with_last_byte(1), vec![1, 2, 3, 4]))],
            mainnet.default_options(),
        );
        mainnet.scheduler().on_block(1).await;
        assert_eq!(handle.results()[0].block_number, Some(1));

        let hash = engine
            .executor(ChainId::new(10))
            .unwrap()
            .execute(
                || {
                    Ok(TxPayload {
                        from: Address::with_last_byte(0xaa),
                        to: Address::with_last_byte(2),
                        data: Bytes::new(),
                        value: Default::default(),
                    })
                },
                TransactionInfo::new(TransactionKind::Other, "ping"),
            )
            .await
            .unwrap();
        assert!(engine.tracker().get(ChainId::new(10), &hash).is_some());

        engine.clear_chain(ChainId::new(10));
        assert!(engine.tracker().get(ChainId::new(10), &hash).is_none());
        assert_eq!(handle.results()[0].block_number, Some(1));
    }
}
