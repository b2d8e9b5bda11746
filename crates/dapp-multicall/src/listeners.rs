use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use dapp_domain::{CallKey, ChainId};
use dashmap::DashMap;
use tokio::sync::watch;

/// Refresh options for a set of subscribed calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
    blocks_per_fetch: u64,
}

impl ListenerOptions {
    /// Refresh at most once every `blocks_per_fetch` blocks (minimum 1).
    pub fn every(blocks_per_fetch: u64) -> Self {
        Self {
            blocks_per_fetch: blocks_per_fetch.max(1),
        }
    }

    pub fn blocks_per_fetch(&self) -> u64 {
        self.blocks_per_fetch
    }
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self::every(1)
    }
}

/// cadence -> live registration count
type Cadences = BTreeMap<u64, usize>;

/// Reference-counted registrations of interest in calls, per chain.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    chains: DashMap<ChainId, HashMap<CallKey, Cadences>>,
    generations: DashMap<ChainId, watch::Sender<u64>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register interest in `keys`. The registrations last as long as the
    /// returned handle.
    pub fn subscribe(
        self: &Arc<Self>,
        chain_id: ChainId,
        keys: Vec<CallKey>,
        options: ListenerOptions,
    ) -> CallSubscription {
        if !keys.is_empty() {
            {
                let mut chain = self.chains.entry(chain_id).or_default();
                for key in &keys {
                    *chain
                        .entry(key.clone())
                        .or_default()
                        .entry(options.blocks_per_fetch)
                        .or_default() += 1;
                }
            }
            self.bump_generation(chain_id);
        }

        CallSubscription {
            registry: Arc::clone(self),
            chain_id,
            keys,
            blocks_per_fetch: options.blocks_per_fetch,
            released: false,
        }
    }

    fn release(&self, chain_id: ChainId, keys: &[CallKey], blocks_per_fetch: u64) {
        let Some(mut chain) = self.chains.get_mut(&chain_id) else {
            tracing::warn!(%chain_id, "Released call listeners for an unknown chain");
            return;
        };

        for key in keys {
            let Some(cadences) = chain.get_mut(key) else {
                tracing::warn!(%chain_id, %key, "Released a call listener that was not registered");
                continue;
            };
            match cadences.get_mut(&blocks_per_fetch) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    cadences.remove(&blocks_per_fetch);
                }
                None => {
                    tracing::warn!(
                        %chain_id,
                        %key,
                        blocks_per_fetch,
                        "Released a call listener with an unknown cadence"
                    );
                }
            }
            if cadences.is_empty() {
                chain.remove(key);
            }
        }
    }

    /// Live registrations for `key`, across all cadences.
    pub fn listener_count(&self, chain_id: ChainId, key: &CallKey) -> usize {
        self.chains
            .get(&chain_id)
            .and_then(|chain| chain.get(key).map(|cadences| cadences.values().sum()))
            .unwrap_or(0)
    }

    /// Every key with at least one live registration, mapped to the fastest
    /// cadence requested for it.
    pub fn active_keys(&self, chain_id: ChainId) -> HashMap<CallKey, u64> {
        let Some(chain) = self.chains.get(&chain_id) else {
            return HashMap::new();
        };

        chain
            .iter()
            .filter_map(|(key, cadences)| {
                cadences
                    .iter()
                    .find(|(_, count)| **count > 0)
                    .map(|(blocks_per_fetch, _)| (key.clone(), *blocks_per_fetch))
            })
            .collect()
    }

    /// Receiver that changes whenever new registrations are added on the chain.
    pub fn watch(&self, chain_id: ChainId) -> watch::Receiver<u64> {
        self.generations
            .entry(chain_id)
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    fn bump_generation(&self, chain_id: ChainId) {
        if let Some(sender) = self.generations.get(&chain_id) {
            sender.send_modify(|generation| *generation = generation.wrapping_add(1));
        }
    }
}

/// Handle for a set of registrations; dropping it releases them.
#[derive(Debug)]
pub struct CallSubscription {
    registry: Arc<ListenerRegistry>,
    chain_id: ChainId,
    keys: Vec<CallKey>,
    blocks_per_fetch: u64,
    released: bool,
}

impl CallSubscription {
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn keys(&self) -> &[CallKey] {
        &self.keys
    }

    pub fn blocks_per_fetch(&self) -> u64 {
        self.blocks_per_fetch
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) || self.keys.is_empty() {
            return;
        }
        self.registry
            .release(self.chain_id, &self.keys, self.blocks_per_fetch);
    }
}

impl Drop for CallSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
