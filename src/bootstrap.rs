use std::{sync::Arc, time::Duration};

use dapp_blockchain::{ChainClient, EvmChain};
use dapp_multicall::{CallsHandle, ListenerOptions};
use dapp_transactions::PendingTransactions;

use crate::{
    config::{Config, TrackerConfig, WatchedCall},
    engine::{ChainSettings, Engine},
    error::EngineError,
};

/// Connect every enabled chain and assemble the engine around them.
pub(crate) async fn build_engine(config: &Config) -> Result<Engine, EngineError> {
    let mut engine = Engine::new(Arc::new(build_tracker(&config.tracker)));

    for chain_config in &config.chains.0 {
        let chain_id = chain_config.chain_id;
        let chain = EvmChain::new(chain_config.clone())
            .await
            .map_err(|source| EngineError::ChainInit { chain_id, source })?;

        tracing::info!(
            %chain_id,
            endpoints = chain_config.rpc_endpoints.len(),
            signer = ?chain.signer_address(),
            "Chain connected"
        );

        let client: Arc<dyn ChainClient> = Arc::new(chain);
        engine.add_chain(client, ChainSettings::from(chain_config));
    }

    Ok(engine)
}

fn build_tracker(config: &TrackerConfig) -> PendingTransactions {
    match config
        .pending_ttl()
        .and_then(|ttl| chrono::TimeDelta::from_std(ttl).ok())
    {
        Some(ttl) => PendingTransactions::with_ttl(ttl),
        None => PendingTransactions::new(),
    }
}

/// A configured read, kept subscribed for the lifetime of the process.
pub(crate) struct WatchedSubscription {
    pub(crate) watched: WatchedCall,
    pub(crate) handle: CallsHandle,
}

pub(crate) fn subscribe_watched_calls(
    engine: &Engine,
    watched: &[WatchedCall],
) -> Vec<WatchedSubscription> {
    watched
        .iter()
        .filter_map(|watched| {
            let chain = engine.chain(watched.chain_id)?;
            let options = watched
                .blocks_per_fetch
                .map(ListenerOptions::every)
                .unwrap_or_else(|| chain.default_options());
            let handle = engine.reader().subscribe_calls(
                watched.chain_id,
                [Some(watched.call.clone())],
                options,
            );
            Some(WatchedSubscription {
                watched: watched.clone(),
                handle,
            })
        })
        .collect()
}

/// Interval between TTL sweeps, when a TTL is configured.
pub(crate) fn expiry_interval(config: &TrackerConfig) -> Option<Duration> {
    config.pending_ttl().map(|_| config.expiry_interval())
}
