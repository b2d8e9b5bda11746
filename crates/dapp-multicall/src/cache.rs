use std::collections::HashMap;

use alloy::primitives::Bytes;
use dapp_domain::{CallKey, CallResult, ChainId};
use dashmap::DashMap;
use tokio::sync::watch;

/// Stored state of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedCall {
    pub data: Option<Bytes>,
    /// Block the data was read at. Never decreases.
    pub block_number: Option<u64>,
    /// Block of the most recent request still in flight.
    pub fetching_block_number: Option<u64>,
}

#[derive(Debug, Default)]
struct ChainCalls {
    calls: HashMap<CallKey, CachedCall>,
    latest_block: Option<u64>,
}

/// Process-wide store of raw call results, partitioned by chain.
///
/// Writers go through [`CallCache::apply_results`], which drops anything older
/// than what is already stored. Readers can await [`CallCache::subscribe`] to
/// learn when a chain's data changed.
#[derive(Debug, Default)]
pub struct CallCache {
    chains: DashMap<ChainId, ChainCalls>,
    revisions: DashMap<ChainId, watch::Sender<u64>>,
}

impl CallCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chain_id: ChainId, key: &CallKey) -> Option<CachedCall> {
        self.chains
            .get(&chain_id)
            .and_then(|chain| chain.calls.get(key).cloned())
    }

    /// Result as seen by a consumer that holds a registration for `key`.
    pub fn result(&self, chain_id: ChainId, key: &CallKey) -> CallResult {
        match self.get(chain_id, key) {
            Some(CachedCall {
                data,
                block_number,
                ..
            }) => CallResult {
                valid: true,
                data,
                block_number,
            },
            None => CallResult::LOADING,
        }
    }

    /// Highest block observed for the chain.
    pub fn latest_block(&self, chain_id: ChainId) -> Option<u64> {
        self.chains.get(&chain_id).and_then(|chain| chain.latest_block)
    }

    /// Raise the chain's latest block. An advance can turn stored results into
    /// syncing ones, so subscribers are notified.
    pub fn observe_block(&self, chain_id: ChainId, block_number: u64) {
        let advanced = {
            let mut chain = self.chains.entry(chain_id).or_default();
            let advanced = chain.latest_block.is_none_or(|latest| block_number > latest);
            if advanced {
                chain.latest_block = Some(block_number);
            }
            advanced
        };

        if advanced {
            self.bump_revision(chain_id);
        }
    }

    /// Keys from `listening` whose data is older than their cadence allows at
    /// `latest_block` and that are not already being fetched recently enough.
    ///
    /// `listening` maps each key to its effective `blocks_per_fetch`.
    pub fn outdated_keys(
        &self,
        chain_id: ChainId,
        listening: &HashMap<CallKey, u64>,
        latest_block: u64,
    ) -> Vec<CallKey> {
        let chain = self.chains.get(&chain_id);
        let mut outdated: Vec<CallKey> = listening
            .iter()
            .filter(|(key, blocks_per_fetch)| {
                let Some(entry) = chain.as_ref().and_then(|chain| chain.calls.get(*key)) else {
                    return true;
                };

                let min_data_block = latest_block.saturating_sub(blocks_per_fetch.saturating_sub(1));
                if entry.fetching_block_number.is_some_and(|fetching| fetching >= min_data_block) {
                    return false;
                }
                entry.block_number.is_none_or(|block| block < min_data_block)
            })
            .map(|(key, _)| key.clone())
            .collect();
        outdated.sort();
        outdated
    }

    /// Record that `keys` are being fetched for `block_number`.
    pub fn mark_fetching(&self, chain_id: ChainId, keys: &[CallKey], block_number: u64) {
        let mut chain = self.chains.entry(chain_id).or_default();
        for key in keys {
            let entry = chain.calls.entry(key.clone()).or_default();
            if entry
                .fetching_block_number
                .is_none_or(|fetching| fetching < block_number)
            {
                entry.fetching_block_number = Some(block_number);
            }
        }
    }

    /// Store results read at `block_number`. Results older than what is stored
    /// are ignored. Returns how many entries changed.
    pub fn apply_results(
        &self,
        chain_id: ChainId,
        block_number: u64,
        results: impl IntoIterator<Item = (CallKey, Bytes)>,
    ) -> usize {
        let mut applied = 0;
        {
            let mut chain = self.chains.entry(chain_id).or_default();
            for (key, data) in results {
                let entry = chain.calls.entry(key).or_default();
                if entry.block_number.is_some_and(|current| current > block_number) {
                    continue;
                }
                if entry
                    .fetching_block_number
                    .is_some_and(|fetching| fetching <= block_number)
                {
                    entry.fetching_block_number = None;
                }
                entry.data = Some(data);
                entry.block_number = Some(block_number);
                applied += 1;
            }
        }

        if applied > 0 {
            self.bump_revision(chain_id);
        }
        applied
    }

    /// Drop in-flight markers for a fetch that failed, leaving data untouched.
    pub fn fetch_failed(&self, chain_id: ChainId, keys: &[CallKey], block_number: u64) {
        let Some(mut chain) = self.chains.get_mut(&chain_id) else {
            return;
        };
        for key in keys {
            if let Some(entry) = chain.calls.get_mut(key)
                && entry.fetching_block_number == Some(block_number)
            {
                entry.fetching_block_number = None;
            }
        }
    }

    pub fn clear_chain(&self, chain_id: ChainId) {
        if self.chains.remove(&chain_id).is_some() {
            self.bump_revision(chain_id);
        }
    }

    pub fn clear_all(&self) {
        let chain_ids: Vec<ChainId> = self.chains.iter().map(|chain| *chain.key()).collect();
        for chain_id in chain_ids {
            self.clear_chain(chain_id);
        }
    }

    /// Receiver whose value changes whenever the chain's stored data changes.
    pub fn subscribe(&self, chain_id: ChainId) -> watch::Receiver<u64> {
        self.revisions
            .entry(chain_id)
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    fn bump_revision(&self, chain_id: ChainId) {
        if let Some(sender) = self.revisions.get(&chain_id) {
            sender.send_modify(|revision| *revision = revision.wrapping_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::{Address, bytes};
    use dapp_domain::Call;

    use super::*;

    const CHAIN: ChainId = ChainId::new(1);

    fn key(n: u8) -> CallKey {
        Call::new(Address::with_last_byte(n), vec![n]).key()
    }

    fn permutations(items: &[u64]) -> Vec<Vec<u64>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn highest_block_wins_regardless_of_arrival_order() {
        let blocks = [3u64, 7, 5, 9];
        for order in permutations(&blocks) {
            let cache = CallCache::new();
            for block in &order {
                cache.apply_results(CHAIN, *block, [(key(1), Bytes::from(block.to_be_bytes().to_vec()))]);
            }
            let stored = cache.get(CHAIN, &key(1)).unwrap();
            assert_eq!(stored.block_number, Some(9), "order {order:?}");
            assert_eq!(stored.data, Some(Bytes::from(9u64.to_be_bytes().to_vec())));
        }
    }

    #[test]
    fn stale_result_is_not_counted() {
        let cache = CallCache::new();
        assert_eq!(cache.apply_results(CHAIN, 10, [(key(1), bytes!("01"))]), 1);
        assert_eq!(cache.apply_results(CHAIN, 9, [(key(1), bytes!("02"))]), 0);
        assert_eq!(cache.get(CHAIN, &key(1)).unwrap().data, Some(bytes!("01")));
    }

    #[test]
    fn outdated_respects_cadence_and_in_flight_fetches() {
        let cache = CallCache::new();
        let listening = HashMap::from([(key(1), 1u64), (key(2), 3u64), (key(3), 1u64)]);

        cache.apply_results(CHAIN, 10, [(key(1), bytes!("01")), (key(2), bytes!("02"))]);

        // block 11: key1 (cadence 1) stale, key2 (cadence 3) fresh, key3 never fetched
        assert_eq!(cache.outdated_keys(CHAIN, &listening, 11), vec![key(1), key(3)]);

        cache.mark_fetching(CHAIN, &[key(1), key(3)], 11);
        assert!(cache.outdated_keys(CHAIN, &listening, 11).is_empty());

        // block 13: key2 is now 3 blocks old, key1/key3 requests for 11 are too old
        let mut outdated = cache.outdated_keys(CHAIN, &listening, 13);
        outdated.sort();
        assert_eq!(outdated, vec![key(1), key(2), key(3)]);
    }

    #[test]
    fn failed_fetch_clears_marker_only() {
        let cache = CallCache::new();
        cache.apply_results(CHAIN, 5, [(key(1), bytes!("aa"))]);
        cache.mark_fetching(CHAIN, &[key(1)], 6);
        cache.fetch_failed(CHAIN, &[key(1)], 6);

        let stored = cache.get(CHAIN, &key(1)).unwrap();
        assert_eq!(stored.fetching_block_number, None);
        assert_eq!(stored.data, Some(bytes!("aa")));
        assert_eq!(stored.block_number, Some(5));
    }

    #[test]
    fn result_reports_loading_until_answered() {
        let cache = CallCache::new();
        assert_eq!(cache.result(CHAIN, &key(1)), CallResult::LOADING);

        cache.mark_fetching(CHAIN, &[key(1)], 4);
        assert_eq!(cache.result(CHAIN, &key(1)), CallResult::LOADING);

        cache.apply_results(CHAIN, 4, [(key(1), bytes!("ff"))]);
        assert_eq!(cache.result(CHAIN, &key(1)), CallResult::fetched(bytes!("ff"), 4));
    }

    #[test]
    fn chains_are_isolated() {
        let cache = CallCache::new();
        let other = ChainId::new(137);
        cache.apply_results(CHAIN, 1, [(key(1), bytes!("01"))]);
        cache.observe_block(CHAIN, 1);
        cache.clear_chain(other);

        assert!(cache.get(CHAIN, &key(1)).is_some());
        assert!(cache.get(other, &key(1)).is_none());

        cache.clear_chain(CHAIN);
        assert!(cache.get(CHAIN, &key(1)).is_none());
        assert_eq!(cache.latest_block(CHAIN), None);
    }

    #[tokio::test]
    async fn subscribers_see_applied_results() {
        let cache = CallCache::new();
        let mut revisions = cache.subscribe(CHAIN);

        cache.apply_results(CHAIN, 1, [(key(1), bytes!("01"))]);
        revisions.changed().await.unwrap();
        assert_eq!(*revisions.borrow_and_update(), 1);

        cache.apply_results(CHAIN, 0, [(key(1), bytes!("02"))]);
        assert!(!revisions.has_changed().unwrap());
    }

    #[test]
    fn observed_block_is_monotonic() {
        let cache = CallCache::new();
        cache.observe_block(CHAIN, 10);
        cache.observe_block(CHAIN, 8);
        assert_eq!(cache.latest_block(CHAIN), Some(10));
    }

    #[test]
    fn new_block_notifies_subscribers_once() {
        let cache = CallCache::new();
        let mut revisions = cache.subscribe(CHAIN);

        cache.observe_block(CHAIN, 10);
        assert!(revisions.has_changed().unwrap());
        revisions.borrow_and_update();

        cache.observe_block(CHAIN, 10);
        cache.observe_block(CHAIN, 9);
        assert!(!revisions.has_changed().unwrap());
    }
}
