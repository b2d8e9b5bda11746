//! RPC boundary: the [`ChainClient`] trait consumed by the read scheduler and
//! the transaction pipeline, and its alloy-backed [`EvmChain`] implementation.

mod client;
mod config;
mod config_error;
mod error;
mod error_classification;
mod evm;
mod multicall;
mod revert;
mod rpc_executor;
mod rpc_rate_limiter;

pub use client::{ChainClient, MulticallResponse, MulticallResult};
pub use config::{ChainConfig, ChainConfigRaw, ChainsConfig, ChainsConfigRaw};
pub use config_error::ConfigError;
pub use error::BlockchainError;
pub use error_classification::{USER_REJECTION_CODE, is_network_failure, is_user_rejection};
pub use evm::{EvmChain, MULTICALL3_ADDRESS};
pub use multicall::MulticallBatch;
pub use revert::{decode_panic, decode_revert_string, revert_reason, revert_reason_from_message};
pub use rpc_executor::RetryPolicy;
