//! Gas-budgeted batching of read calls into Multicall3 requests.

use dapp_domain::{Call, CallKey};

/// A set of calls to be sent as one or more aggregated reads.
///
/// Calls keep their insertion order; chunks are filled greedily so each stays
/// within the gas budget. A call whose own requirement exceeds the budget is
/// sent alone.
#[derive(Debug, Default, Clone)]
pub struct MulticallBatch {
    entries: Vec<(CallKey, Call)>,
}

impl MulticallBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, key: CallKey, call: Call) {
        self.entries.push((key, call));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_chunks(self, gas_limit: u64) -> Vec<Vec<(CallKey, Call)>> {
        let mut chunks = Vec::new();
        let mut current: Vec<(CallKey, Call)> = Vec::new();
        let mut current_gas = 0u64;

        for (key, call) in self.entries {
            let gas = call.gas_budget();
            if !current.is_empty() && current_gas.saturating_add(gas) > gas_limit {
                chunks.push(std::mem::take(&mut current));
                current_gas = 0;
            }
            current_gas = current_gas.saturating_add(gas);
            current.push((key, call));
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, Bytes};
    use dapp_domain::DEFAULT_GAS_REQUIRED;

    use super::*;

    fn call(n: u8, gas: Option<u64>) -> (CallKey, Call) {
        let mut call = Call::new(Address::with_last_byte(n), Bytes::from(vec![n]));
        call.gas_required = gas;
        (call.key(), call)
    }

    fn batch(calls: impl IntoIterator<Item = (CallKey, Call)>) -> MulticallBatch {
        let mut batch = MulticallBatch::new();
        for (key, call) in calls {
            batch.add(key, call);
        }
        batch
    }

    #[test]
    fn default_gas_fills_chunks_evenly() {
        let batch = batch((0..5).map(|n| call(n, None)));

        let chunks = batch.into_chunks(2 * DEFAULT_GAS_REQUIRED);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn preserves_order_across_chunks() {
        let chunks = batch((0..4).map(|n| call(n, Some(10)))).into_chunks(20);
        let targets: Vec<u8> = chunks
            .iter()
            .flatten()
            .map(|(_, call)| call.target.0[19])
            .collect();
        assert_eq!(targets, vec![0, 1, 2, 3]);
    }

    #[test]
    fn oversized_call_is_sent_alone() {
        let chunks = batch([call(1, Some(5)), call(2, Some(500)), call(3, Some(5))]).into_chunks(100);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1, 1, 1]);
    }

    #[test]
    fn empty_batch_has_no_chunks() {
        assert!(MulticallBatch::new().into_chunks(100).is_empty());
    }
}
