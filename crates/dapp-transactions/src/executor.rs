use std::{sync::Arc, time::Instant};

use dapp_blockchain::{BlockchainError, ChainClient, is_network_failure, is_user_rejection};
use dapp_domain::{ChainId, TransactionInfo, TransactionKind, TxHash, TxPayload};
use dapp_observability::record_blockchain_tx_stage;

use crate::{BuildError, PendingTransactions, TxError};

/// Default safety margin added on top of the gas estimate: 20%.
pub const DEFAULT_GAS_MARGIN_BPS: u64 = 2_000;

/// `estimate * (10000 + margin_bps) / 10000`, saturating at `u64::MAX`.
pub fn apply_gas_margin(estimate: u64, margin_bps: u64) -> u64 {
    let scaled = u128::from(estimate) * (10_000 + u128::from(margin_bps)) / 10_000;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Builds, prices, submits and tracks transactions on one chain.
pub struct TransactionExecutor {
    client: Arc<dyn ChainClient>,
    tracker: Arc<PendingTransactions>,
    gas_margin_bps: u64,
}

impl TransactionExecutor {
    pub fn new(client: Arc<dyn ChainClient>, tracker: Arc<PendingTransactions>) -> Self {
        Self {
            client,
            tracker,
            gas_margin_bps: DEFAULT_GAS_MARGIN_BPS,
        }
    }

    pub fn with_gas_margin_bps(mut self, gas_margin_bps: u64) -> Self {
        self.gas_margin_bps = gas_margin_bps;
        self
    }

    pub fn chain_id(&self) -> ChainId {
        self.client.chain_id()
    }

    pub fn tracker(&self) -> &Arc<PendingTransactions> {
        &self.tracker
    }

    /// Run `build`, estimate gas, submit, and start tracking the result.
    ///
    /// A failed estimate is replayed as a read-only call so the caller sees
    /// the contract's revert reason rather than a generic estimation error.
    #[tracing::instrument(
        skip_all,
        fields(chain_id = %self.chain_id(), kind = info.kind.as_str(), summary = %info.summary)
    )]
    pub async fn execute<F>(&self, build: F, info: TransactionInfo) -> Result<TxHash, TxError>
    where
        F: FnOnce() -> Result<TxPayload, BuildError>,
    {
        let kind = info.kind;

        let started = Instant::now();
        let payload = match build() {
            Ok(payload) => {
                self.record(kind, "build", "success", started);
                payload
            }
            Err(e) => {
                self.record(kind, "build", "error", started);
                tracing::debug!(error = %e, "Transaction not built");
                return Err(e.into());
            }
        };

        let gas_limit = self.estimate(&payload, kind).await?;
        let hash = self.submit(&payload, gas_limit, kind).await?;

        if let Err(e) = self.tracker.track(self.chain_id(), hash, payload.from, info) {
            tracing::warn!(%hash, error = %e, "Submitted transaction was already tracked");
        }
        Ok(hash)
    }

    async fn estimate(&self, payload: &TxPayload, kind: TransactionKind) -> Result<u64, TxError> {
        let started = Instant::now();
        match self.client.estimate_gas(payload).await {
            Ok(estimate) => {
                self.record(kind, "estimate", "success", started);
                let gas_limit = apply_gas_margin(estimate, self.gas_margin_bps);
                tracing::debug!(estimate, gas_limit, "Gas estimated");
                Ok(gas_limit)
            }
            Err(estimate_err) => {
                self.record(kind, "estimate", "error", started);
                tracing::debug!(error = %estimate_err, "Gas estimation failed; simulating");
                Err(self.explain_failed_estimate(payload, kind, estimate_err).await)
            }
        }
    }

    async fn explain_failed_estimate(
        &self,
        payload: &TxPayload,
        kind: TransactionKind,
        estimate_err: BlockchainError,
    ) -> TxError {
        let started = Instant::now();
        let simulated = self.client.simulate(payload).await;
        self.record(
            kind,
            "simulate",
            if simulated.is_ok() { "success" } else { "error" },
            started,
        );

        let err = match simulated {
            Err(sim_err) => match sim_err.revert_reason() {
                Some(reason) => TxError::SimulatedRevert { reason },
                None if is_network_failure(&sim_err) => TxError::NetworkFailure {
                    message: sim_err.to_string(),
                },
                None => TxError::EstimationFailed {
                    message: estimate_err.provider_message(),
                },
            },
            // The call itself goes through; only the estimate carries a reason, if any.
            Ok(_) => match estimate_err.revert_reason() {
                Some(reason) => TxError::SimulatedRevert { reason },
                None if is_network_failure(&estimate_err) => TxError::NetworkFailure {
                    message: estimate_err.to_string(),
                },
                None => TxError::EstimationFailed {
                    message: estimate_err.provider_message(),
                },
            },
        };

        tracing::info!(error = %err, "Transaction rejected before submission");
        err
    }

    async fn submit(
        &self,
        payload: &TxPayload,
        gas_limit: u64,
        kind: TransactionKind,
    ) -> Result<TxHash, TxError> {
        let started = Instant::now();
        match self.client.send_transaction(payload, gas_limit).await {
            Ok(hash) => {
                self.record(kind, "submit", "success", started);
                tracing::info!(%hash, gas_limit, "Transaction submitted");
                Ok(hash)
            }
            Err(e) if is_user_rejection(&e) => {
                self.record(kind, "submit", "cancelled", started);
                tracing::info!("Transaction cancelled by user");
                Err(TxError::UserCancelled)
            }
            Err(e) => {
                self.record(kind, "submit", "error", started);
                tracing::warn!(error = %e, "Transaction submission failed");
                Err(TxError::TransactionFailed {
                    message: e.provider_message(),
                })
            }
        }
    }

    fn record(&self, kind: TransactionKind, stage: &str, status: &str, started: Instant) {
        record_blockchain_tx_stage(
            self.chain_id().as_u64(),
            kind.as_str(),
            stage,
            status,
            started.elapsed(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_margin_math() {
        assert_eq!(apply_gas_margin(100_000, DEFAULT_GAS_MARGIN_BPS), 120_000);
        assert_eq!(apply_gas_margin(100_000, 0), 100_000);
        assert_eq!(apply_gas_margin(21_001, 2_000), 25_201);
        assert_eq!(apply_gas_margin(u64::MAX, 2_000), u64::MAX);
    }
}
