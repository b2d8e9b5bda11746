mod contracts;
mod provider;
mod wallets;

use std::time::Instant;

use alloy::{
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use async_trait::async_trait;
pub use contracts::MULTICALL3_ADDRESS;
use contracts::Multicall3;
use dapp_domain::{Call, ChainId, TxHash, TxPayload, TxReceipt};
use dapp_observability::{record_blockchain_rpc_call, record_blockchain_rpc_retry};
use provider::{BlockchainProvider, initialize_provider};
use tokio::sync::{Mutex, RwLock};
use wallets::wallet_from_private_key;

use crate::{
    BlockchainError, ChainClient, ChainConfig, MulticallResponse, MulticallResult,
    rpc_executor::{RetryPolicy, RetryableError, backoff_delay},
    rpc_rate_limiter::RpcRateLimiter,
};

/// alloy-backed [`ChainClient`] for one EVM chain.
pub struct EvmChain {
    config: ChainConfig,
    provider: RwLock<BlockchainProvider>,
    rpc_rate_limiter: RpcRateLimiter,
    provider_refresh_mutex: Mutex<()>,
    rpc_retry_policy: RetryPolicy,
}

impl EvmChain {
    pub async fn new(config: ChainConfig) -> Result<Self, BlockchainError> {
        let provider = Self::connect(&config)
            .await
            .map_err(|e| BlockchainError::ProviderInit {
                reason: e.to_string(),
            })?;

        let rpc_rate_limiter = RpcRateLimiter::new(config.max_rpc_requests_per_second);
        if let Some(rps) = config.max_rpc_requests_per_second {
            tracing::info!(
                chain_id = %config.chain_id,
                rps,
                "RPC rate limiting enabled"
            );
        }

        let rpc_retry_policy = RetryPolicy {
            max_attempts: config.rpc_max_attempts,
            ..RetryPolicy::rpc_default()
        };

        Ok(Self {
            provider: RwLock::new(provider),
            config,
            rpc_rate_limiter,
            provider_refresh_mutex: Mutex::new(()),
            rpc_retry_policy,
        })
    }

    async fn connect(config: &ChainConfig) -> Result<BlockchainProvider, BlockchainError> {
        let wallet = config
            .signer_private_key
            .as_deref()
            .map(wallet_from_private_key)
            .transpose()?;

        initialize_provider(config.chain_id, &config.rpc_endpoints, wallet).await
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Address transactions are sent from when a local signer is configured.
    pub fn signer_address(&self) -> Option<Address> {
        self.config.signer_address
    }

    async fn provider(&self) -> BlockchainProvider {
        self.provider.read().await.clone()
    }

    async fn refresh_provider(&self) -> Result<(), BlockchainError> {
        let Ok(_guard) = self.provider_refresh_mutex.try_lock() else {
            // Another caller is already reconnecting.
            return Ok(());
        };

        let provider = Self::connect(&self.config).await?;
        *self.provider.write().await = provider;
        tracing::info!(chain_id = %self.config.chain_id, "RPC provider refreshed");
        Ok(())
    }

    /// Execute an RPC call with rate limiting and retries on transient errors.
    async fn rpc_call<T, E, F, O>(&self, method: &'static str, mut operation: F) -> Result<T, E>
    where
        E: RetryableError,
        F: FnMut() -> O,
        O: std::future::IntoFuture<Output = Result<T, E>>,
    {
        let chain_id = self.config.chain_id.as_u64();
        let mut attempt = 1;
        loop {
            self.rpc_rate_limiter.acquire().await;
            let started = Instant::now();
            let result = operation().into_future().await;
            match result {
                Ok(value) => {
                    record_blockchain_rpc_call(chain_id, method, "success", started.elapsed());
                    return Ok(value);
                }
                Err(err) => {
                    record_blockchain_rpc_call(chain_id, method, "error", started.elapsed());
                    let retryable = err.is_retryable();
                    if attempt >= self.rpc_retry_policy.max_attempts || !retryable {
                        return Err(err);
                    }

                    if err.should_refresh_provider()
                        && let Err(refresh_err) = self.refresh_provider().await
                    {
                        tracing::error!(
                            chain_id = %self.config.chain_id,
                            error = %refresh_err,
                            "Failed to refresh provider after backend error"
                        );
                    }

                    let delay = backoff_delay(&self.rpc_retry_policy, attempt, err.backoff_hint());
                    tracing::warn!(
                        chain_id = %self.config.chain_id,
                        method,
                        attempt,
                        max_attempts = self.rpc_retry_policy.max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "RPC call failed; retrying"
                    );
                    record_blockchain_rpc_retry(chain_id, method);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn transaction_request(payload: &TxPayload) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(payload.from)
        .with_to(payload.to)
        .with_input(payload.data.clone())
        .with_value(payload.value)
}

fn receipt_from_rpc(receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        transaction_hash: ReceiptResponse::transaction_hash(receipt),
        block_number: ReceiptResponse::block_number(receipt),
        block_hash: ReceiptResponse::block_hash(receipt),
        status: ReceiptResponse::status(receipt),
        gas_used: ReceiptResponse::gas_used(receipt),
        from: ReceiptResponse::from(receipt),
        to: ReceiptResponse::to(receipt),
    }
}

#[async_trait]
impl ChainClient for EvmChain {
    fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    async fn block_number(&self) -> Result<u64, BlockchainError> {
        self.rpc_call("eth_blockNumber", || async {
            self.provider().await.get_block_number().await
        })
        .await
        .map_err(|e| BlockchainError::rpc("eth_blockNumber", &e))
    }

    async fn aggregate(&self, calls: &[Call]) -> Result<MulticallResponse, BlockchainError> {
        const METHOD: &str = "multicall_tryBlockAndAggregate";

        let requests: Vec<Multicall3::Call> = calls
            .iter()
            .map(|call| Multicall3::Call {
                target: call.target,
                callData: call.call_data.clone(),
            })
            .collect();

        let output = self
            .rpc_call(METHOD, || {
                let requests = requests.clone();
                async move {
                    let multicall =
                        Multicall3::new(self.config.multicall_address, self.provider().await);
                    let result = multicall
                        .tryBlockAndAggregate(false, requests)
                        .call()
                        .await;
                    result
                }
            })
            .await
            .map_err(|e| BlockchainError::contract(METHOD, &e))?;

        if output.returnData.len() != calls.len() {
            return Err(BlockchainError::MalformedMulticall {
                expected: calls.len(),
                actual: output.returnData.len(),
            });
        }

        Ok(MulticallResponse {
            block_number: output.blockNumber.saturating_to::<u64>(),
            results: output
                .returnData
                .into_iter()
                .map(|result| MulticallResult {
                    success: result.success,
                    return_data: result.returnData,
                })
                .collect(),
        })
    }

    async fn estimate_gas(&self, payload: &TxPayload) -> Result<u64, BlockchainError> {
        let request = transaction_request(payload);
        self.rpc_call("eth_estimateGas", || {
            let request = request.clone();
            async move { self.provider().await.estimate_gas(request).await }
        })
        .await
        .map_err(|e| BlockchainError::rpc("eth_estimateGas", &e))
    }

    async fn simulate(&self, payload: &TxPayload) -> Result<Bytes, BlockchainError> {
        let request = transaction_request(payload);
        self.rpc_call("eth_call", || {
            let request = request.clone();
            async move { self.provider().await.call(request).await }
        })
        .await
        .map_err(|e| BlockchainError::rpc("eth_call", &e))
    }

    async fn send_transaction(
        &self,
        payload: &TxPayload,
        gas_limit: u64,
    ) -> Result<TxHash, BlockchainError> {
        const METHOD: &str = "eth_sendTransaction";

        // Submissions are never retried here; a resend could double-spend a nonce.
        let request = transaction_request(payload).with_gas_limit(gas_limit);
        self.rpc_rate_limiter.acquire().await;
        let started = Instant::now();
        let provider = self.provider().await;
        let result = provider.send_transaction(request).await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_blockchain_rpc_call(
            self.config.chain_id.as_u64(),
            METHOD,
            status,
            started.elapsed(),
        );

        result
            .map(|pending| *pending.tx_hash())
            .map_err(|e| BlockchainError::rpc(METHOD, &e))
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TxReceipt>, BlockchainError> {
        self.rpc_call("eth_getTransactionReceipt", || async move {
            self.provider().await.get_transaction_receipt(hash).await
        })
        .await
        .map(|receipt| receipt.as_ref().map(receipt_from_rpc))
        .map_err(|e| BlockchainError::rpc("eth_getTransactionReceipt", &e))
    }
}
