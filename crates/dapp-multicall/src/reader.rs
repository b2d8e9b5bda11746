use std::sync::Arc;

use alloy::{primitives::Address, sol_types::SolCall};
use dapp_domain::{Call, CallKey, CallResult, CallState, ChainId};
use tokio::sync::watch;

use crate::{
    CallCache, CallStates, CallSubscription, ListenerOptions, ListenerRegistry, ResultDecoder,
    decoder::to_call_states,
};

/// Entry point for feature code that reads contract state.
#[derive(Clone)]
pub struct ChainReader {
    cache: Arc<CallCache>,
    listeners: Arc<ListenerRegistry>,
}

impl ChainReader {
    pub fn new(cache: Arc<CallCache>, listeners: Arc<ListenerRegistry>) -> Self {
        Self { cache, listeners }
    }

    pub fn cache(&self) -> &Arc<CallCache> {
        &self.cache
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Subscribe to `calls`. `None` entries stand for calls that cannot be made
    /// (missing contract, missing argument) and always read as invalid.
    pub fn subscribe_calls(
        &self,
        chain_id: ChainId,
        calls: impl IntoIterator<Item = Option<Call>>,
        options: ListenerOptions,
    ) -> CallsHandle {
        let slots: Vec<Option<CallKey>> = calls
            .into_iter()
            .map(|call| call.as_ref().map(CallKey::from))
            .collect();
        let keys = slots.iter().flatten().cloned().collect();

        CallsHandle {
            subscription: self.listeners.subscribe(chain_id, keys, options),
            revision: self.cache.subscribe(chain_id),
            cache: Arc::clone(&self.cache),
            chain_id,
            slots,
        }
    }

    pub fn single_call<C: SolCall>(
        &self,
        chain_id: ChainId,
        target: Option<Address>,
        call: &C,
        options: ListenerOptions,
    ) -> CallsHandle {
        let call = target.map(|target| Call::new(target, call.abi_encode()));
        self.subscribe_calls(chain_id, [call], options)
    }

    /// One contract, many argument sets (e.g. `balanceOf` for several owners).
    pub fn single_contract_multiple_data<C: SolCall>(
        &self,
        chain_id: ChainId,
        target: Option<Address>,
        calls: &[C],
        options: ListenerOptions,
    ) -> CallsHandle {
        let calls = calls
            .iter()
            .map(|call| target.map(|target| Call::new(target, call.abi_encode())));
        self.subscribe_calls(chain_id, calls, options)
    }

    /// Many contracts, one argument set (e.g. `totalSupply` of several tokens).
    pub fn multiple_contract_single_data<C: SolCall>(
        &self,
        chain_id: ChainId,
        targets: &[Option<Address>],
        call: &C,
        options: ListenerOptions,
    ) -> CallsHandle {
        let data = call.abi_encode();
        let calls = targets
            .iter()
            .map(|target| target.map(|target| Call::new(target, data.clone())));
        self.subscribe_calls(chain_id, calls, options)
    }

    /// Forget everything cached for a chain, e.g. after switching networks.
    pub fn clear_chain(&self, chain_id: ChainId) {
        self.cache.clear_chain(chain_id);
    }
}

/// Live view of a set of subscribed calls. Dropping it unsubscribes.
pub struct CallsHandle {
    subscription: CallSubscription,
    revision: watch::Receiver<u64>,
    cache: Arc<CallCache>,
    chain_id: ChainId,
    slots: Vec<Option<CallKey>>,
}

impl CallsHandle {
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn subscription(&self) -> &CallSubscription {
        &self.subscription
    }

    /// Raw results in subscription order.
    pub fn results(&self) -> Vec<CallResult> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(key) => self.cache.result(self.chain_id, key),
                None => CallResult::INVALID,
            })
            .collect()
    }

    pub fn states<D: ResultDecoder>(&self, decoder: &D) -> Vec<CallState<D::Output>> {
        to_call_states(
            &self.results(),
            Some(decoder),
            self.cache.latest_block(self.chain_id),
        )
    }

    /// Like [`CallsHandle::states`], reusing the previous allocation when
    /// nothing changed.
    pub fn states_memo<D: ResultDecoder>(
        &self,
        decoder: &D,
        memo: &mut CallStates<D::Output>,
    ) -> Arc<[CallState<D::Output>]> {
        memo.compute(
            self.results(),
            Some(decoder),
            self.cache.latest_block(self.chain_id),
        )
    }

    /// Wait until the chain's cached data changes. Returns `false` once the
    /// cache is gone.
    pub async fn changed(&mut self) -> bool {
        self.revision.changed().await.is_ok()
    }
}
