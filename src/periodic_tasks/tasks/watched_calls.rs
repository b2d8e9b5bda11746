//! Logs the decoded state of configured reads whenever their chain's cache
//! changes.

use std::sync::Arc;

use alloy::{dyn_abi::DynSolValue, json_abi::Function};
use dapp_domain::CallState;
use dapp_multicall::CallStates;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::WatchedSubscription;

type DecodedStates = Arc<[CallState<Vec<DynSolValue>>]>;

pub(crate) struct WatchedCallsTask {
    subscription: WatchedSubscription,
    memo: CallStates<Vec<DynSolValue>>,
    reported: Option<DecodedStates>,
}

impl WatchedCallsTask {
    pub(crate) fn new(subscription: WatchedSubscription) -> Self {
        Self {
            subscription,
            memo: CallStates::new(),
            reported: None,
        }
    }

    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        let label = self.subscription.watched.label.clone();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(task = "watched_calls", %label, "Periodic task shutting down");
                    break;
                }
                changed = self.subscription.handle.changed() => {
                    if !changed {
                        break;
                    }
                    self.report();
                }
            }
        }
    }

    /// Log the current state unless it is the one already reported.
    fn report(&mut self) -> bool {
        let states = self
            .subscription
            .handle
            .states_memo(&self.subscription.watched.function, &mut self.memo);
        if self
            .reported
            .as_ref()
            .is_some_and(|reported| Arc::ptr_eq(reported, &states))
        {
            return false;
        }

        let watched = &self.subscription.watched;
        for state in states.iter() {
            log_state(&watched.label, &watched.function, state);
        }
        self.reported = Some(states);
        true
    }
}

fn log_state(label: &str, function: &Function, state: &CallState<Vec<DynSolValue>>) {
    let function = function.signature();
    match state {
        CallState::Success(values) => {
            tracing::info!(%label, %function, value = ?values, "Watched call updated")
        }
        CallState::Syncing(values) => {
            tracing::debug!(%label, %function, value = ?values, "Watched call syncing")
        }
        CallState::Loading => tracing::debug!(%label, %function, "Watched call loading"),
        CallState::Invalid => tracing::warn!(%label, %function, "Watched call is invalid"),
        CallState::Error(error) => {
            tracing::warn!(%label, %function, error = %error, "Watched call failed")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::{Address, U256};
    use dapp_domain::{Call, ChainId};
    use dapp_multicall::{CallCache, ChainReader, ListenerOptions, ListenerRegistry};

    use super::*;
    use crate::config::WatchedCall;

    #[test]
    fn reports_only_changes() {
        let chain_id = ChainId::new(1);
        let reader = ChainReader::new(Arc::new(CallCache::new()), ListenerRegistry::new());
        let function = Function::parse("function totalSupply() view returns (uint256)").unwrap();
        let call = Call::new(Address::with_last_byte(1), function.selector().to_vec());
        let handle =
            reader.subscribe_calls(chain_id, [Some(call.clone())], ListenerOptions::default());

        let mut task = WatchedCallsTask::new(WatchedSubscription {
            watched: WatchedCall {
                chain_id,
                label: "supply".to_string(),
                call: call.clone(),
                function,
                blocks_per_fetch: None,
            },
            handle,
        });

        assert!(task.report());
        assert!(!task.report());

        reader.cache().observe_block(chain_id, 7);
        reader.cache().apply_results(
            chain_id,
            7,
            [(call.key(), U256::from(1_000).to_be_bytes_vec().into())],
        );
        assert!(task.report());
        assert_eq!(
            task.reported.as_ref().unwrap()[0],
            CallState::Success(vec![DynSolValue::Uint(U256::from(1_000), 256)])
        );
    }
}
