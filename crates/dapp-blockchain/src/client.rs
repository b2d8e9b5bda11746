use alloy::primitives::Bytes;
use async_trait::async_trait;
use dapp_domain::{Call, ChainId, TxHash, TxPayload, TxReceipt};

use crate::BlockchainError;

/// Outcome of a single call inside an aggregated read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticallResult {
    pub success: bool,
    pub return_data: Bytes,
}

impl MulticallResult {
    pub fn success(return_data: impl Into<Bytes>) -> Self {
        Self {
            success: true,
            return_data: return_data.into(),
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            return_data: Bytes::new(),
        }
    }

    /// Data to cache for this call. Failed calls are stored as empty data.
    pub fn into_cached_data(self) -> Bytes {
        if self.success {
            self.return_data
        } else {
            Bytes::new()
        }
    }
}

/// One aggregated read, executed atomically at `block_number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticallResponse {
    pub block_number: u64,
    /// One entry per requested call, in request order.
    pub results: Vec<MulticallResult>,
}

/// Upstream RPC surface for a single chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> ChainId;

    async fn block_number(&self) -> Result<u64, BlockchainError>;

    /// Execute `calls` in one round trip. Individual call failures are reported
    /// per result; the whole request fails only on transport errors.
    async fn aggregate(&self, calls: &[Call]) -> Result<MulticallResponse, BlockchainError>;

    async fn estimate_gas(&self, payload: &TxPayload) -> Result<u64, BlockchainError>;

    /// Replay `payload` as a read-only call against the latest block.
    async fn simulate(&self, payload: &TxPayload) -> Result<Bytes, BlockchainError>;

    async fn send_transaction(
        &self,
        payload: &TxPayload,
        gas_limit: u64,
    ) -> Result<TxHash, BlockchainError>;

    async fn transaction_receipt(&self, hash: TxHash)
    -> Result<Option<TxReceipt>, BlockchainError>;
}
