//! Turning raw cached results into typed [`CallState`]s.

use std::{marker::PhantomData, sync::Arc};

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt},
    json_abi::Function,
    sol_types::SolCall,
};
use dapp_domain::{CallResult, CallState, DecodeError};

/// Decodes the return data of one contract function.
pub trait ResultDecoder {
    type Output;

    fn decode_output(&self, data: &[u8]) -> Result<Self::Output, String>;
}

/// Decoder for a `sol!`-generated call type.
pub struct SolCallDecoder<C>(PhantomData<fn() -> C>);

impl<C> SolCallDecoder<C> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<C> Default for SolCallDecoder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SolCall> ResultDecoder for SolCallDecoder<C> {
    type Output = C::Return;

    fn decode_output(&self, data: &[u8]) -> Result<Self::Output, String> {
        C::abi_decode_returns(data).map_err(|e| e.to_string())
    }
}

/// Runtime ABI fragment, e.g. parsed from `function balanceOf(address) returns (uint256)`.
impl ResultDecoder for Function {
    type Output = Vec<DynSolValue>;

    fn decode_output(&self, data: &[u8]) -> Result<Self::Output, String> {
        self.abi_decode_output(data).map_err(|e| e.to_string())
    }
}

/// Block below which a result counts as syncing: the higher of the oldest
/// result in the batch and the latest block observed on the chain.
pub fn syncing_block_number(results: &[CallResult], latest_block: Option<u64>) -> Option<u64> {
    let lowest = results.iter().filter_map(|result| result.block_number).min();
    match (lowest, latest_block) {
        (Some(lowest), Some(latest)) => Some(lowest.max(latest)),
        (lowest, latest) => lowest.or(latest),
    }
}

/// Derive the consumer-facing state of one result. Never panics on bad data.
pub fn to_call_state<D: ResultDecoder>(
    result: &CallResult,
    decoder: Option<&D>,
    syncing_block: Option<u64>,
) -> CallState<D::Output> {
    if !result.valid {
        return CallState::Invalid;
    }
    let Some(decoder) = decoder else {
        return CallState::Invalid;
    };
    let (Some(block_number), Some(syncing_block)) = (result.block_number, syncing_block) else {
        return CallState::Loading;
    };

    let data = match &result.data {
        Some(data) if !data.is_empty() => data,
        _ => return CallState::Error(DecodeError::Reverted),
    };

    match decoder.decode_output(data) {
        Ok(value) if block_number < syncing_block => CallState::Syncing(value),
        Ok(value) => CallState::Success(value),
        Err(reason) => {
            tracing::debug!(%reason, "Failed to decode call result");
            CallState::Error(DecodeError::Malformed {
                reason,
                data: data.clone(),
            })
        }
    }
}

/// Decode a batch of results against one decoder.
pub fn to_call_states<D: ResultDecoder>(
    results: &[CallResult],
    decoder: Option<&D>,
    latest_block: Option<u64>,
) -> Vec<CallState<D::Output>> {
    let syncing_block = syncing_block_number(results, latest_block);
    results
        .iter()
        .map(|result| to_call_state(result, decoder, syncing_block))
        .collect()
}

/// Memoized decoding of one consumer's results.
///
/// Returns the same allocation for as long as the inputs stay deep-equal, so
/// callers can cheaply detect "nothing changed" with [`Arc::ptr_eq`].
pub struct CallStates<T> {
    last: Option<Memo<T>>,
}

struct Memo<T> {
    results: Vec<CallResult>,
    syncing_block: Option<u64>,
    states: Arc<[CallState<T>]>,
}

impl<T> Default for CallStates<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T> CallStates<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute<D>(
        &mut self,
        results: Vec<CallResult>,
        decoder: Option<&D>,
        latest_block: Option<u64>,
    ) -> Arc<[CallState<T>]>
    where
        D: ResultDecoder<Output = T>,
    {
        let syncing_block = syncing_block_number(&results, latest_block);
        if let Some(memo) = &self.last
            && memo.syncing_block == syncing_block
            && memo.results == results
        {
            return Arc::clone(&memo.states);
        }

        let states: Arc<[CallState<T>]> = results
            .iter()
            .map(|result| to_call_state(result, decoder, syncing_block))
            .collect();
        self.last = Some(Memo {
            results,
            syncing_block,
            states: Arc::clone(&states),
        });
        states
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::{
        primitives::{Bytes, U256, bytes},
        sol,
        sol_types::SolValue,
    };

    use super::*;

    sol! {
        function balanceOf(address owner) external view returns (uint256);
    }

    fn encoded(value: u64) -> Bytes {
        U256::from(value).abi_encode().into()
    }

    fn decoder() -> SolCallDecoder<balanceOfCall> {
        SolCallDecoder::new()
    }

    #[test]
    fn invalid_and_loading() {
        let decoder = decoder();
        assert_eq!(
            to_call_state(&CallResult::INVALID, Some(&decoder), Some(1)),
            CallState::Invalid
        );
        assert_eq!(
            to_call_state(&CallResult::LOADING, Some(&decoder), Some(1)),
            CallState::Loading
        );
        assert_eq!(
            to_call_state::<SolCallDecoder<balanceOfCall>>(
                &CallResult::fetched(encoded(1), 1),
                None,
                Some(1)
            ),
            CallState::Invalid
        );
    }

    #[test]
    fn success_and_syncing() {
        let decoder = decoder();
        let result = CallResult::fetched(encoded(42), 10);

        assert_eq!(
            to_call_state(&result, Some(&decoder), Some(10)),
            CallState::Success(U256::from(42))
        );
        assert_eq!(
            to_call_state(&result, Some(&decoder), Some(11)),
            CallState::Syncing(U256::from(42))
        );
    }

    #[test]
    fn empty_data_is_reverted() {
        let decoder = decoder();
        let result = CallResult::fetched(Bytes::new(), 3);
        assert_eq!(
            to_call_state(&result, Some(&decoder), Some(3)),
            CallState::Error(DecodeError::Reverted)
        );
    }

    #[test]
    fn malformed_data_is_an_error_not_a_panic() {
        let decoder = decoder();
        let garbage = [bytes!("01"), bytes!("deadbeef"), Bytes::from(vec![0xff; 31])];
        for data in garbage {
            let state = to_call_state(&CallResult::fetched(data.clone(), 1), Some(&decoder), Some(1));
            match state {
                CallState::Error(DecodeError::Malformed { data: raw, .. }) => assert_eq!(raw, data),
                other => panic!("expected malformed error, got {other:?}"),
            }
        }
    }

    #[test]
    fn dynamic_fragment_decodes() {
        let function = Function::parse("function balanceOf(address) returns (uint256)").unwrap();
        let state = to_call_state(&CallResult::fetched(encoded(7), 2), Some(&function), Some(2));
        assert_eq!(
            state.result().unwrap(),
            &vec![DynSolValue::Uint(U256::from(7), 256)]
        );
    }

    #[test]
    fn syncing_block_uses_lowest_result_or_latest() {
        let results = [
            CallResult::fetched(encoded(1), 8),
            CallResult::fetched(encoded(1), 12),
            CallResult::LOADING,
        ];
        assert_eq!(syncing_block_number(&results, Some(5)), Some(8));
        assert_eq!(syncing_block_number(&results, Some(10)), Some(10));
        assert_eq!(syncing_block_number(&[CallResult::LOADING], Some(4)), Some(4));
        assert_eq!(syncing_block_number(&[CallResult::LOADING], None), None);

        let states = to_call_states(&results, Some(&decoder()), Some(10));
        assert!(states[0].is_syncing());
        assert_eq!(states[1], CallState::Success(U256::from(1)));
        assert!(states[2].is_loading());
    }

    #[test]
    fn memo_returns_same_allocation_for_equal_inputs() {
        let decoder = decoder();
        let mut memo = CallStates::new();
        let results = vec![
            CallResult::fetched(encoded(5), 3),
            CallResult::INVALID,
        ];

        let first = memo.compute(results.clone(), Some(&decoder), Some(3));
        let second = memo.compute(results.clone(), Some(&decoder), Some(3));
        assert!(Arc::ptr_eq(&first, &second));

        let changed = memo.compute(
            vec![CallResult::fetched(encoded(6), 4), CallResult::INVALID],
            Some(&decoder),
            Some(4),
        );
        assert!(!Arc::ptr_eq(&first, &changed));
        assert_eq!(changed[0], CallState::Success(U256::from(6)));
    }
}
