use alloy::{
    contract::Error as ContractError,
    primitives::Bytes,
    signers::local::LocalSignerError,
    transports::{RpcError, TransportErrorKind},
};

use crate::{
    error_classification::rpc_error_message,
    revert::{extract_revert_data, revert_reason, revert_reason_from_message},
};

#[derive(Debug, thiserror::Error)]
pub enum BlockchainError {
    #[error("RPC request '{method}' failed: {message}")]
    Rpc {
        method: &'static str,
        code: Option<i64>,
        message: String,
        revert_data: Option<Bytes>,
    },

    #[error("RPC request '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: &'static str, timeout_ms: u64 },

    #[error("Multicall returned {actual} results for {expected} calls")]
    MalformedMulticall { expected: usize, actual: usize },

    #[error("Invalid private key (length: {key_length})")]
    InvalidPrivateKey {
        key_length: usize,
        #[source]
        source: LocalSignerError,
    },

    #[error("RPC connection failed after trying {attempts} endpoint(s)")]
    RpcConnectionFailed { attempts: usize },

    #[error("Provider initialization failed: {reason}")]
    ProviderInit { reason: String },
}

impl BlockchainError {
    pub fn rpc(method: &'static str, err: &RpcError<TransportErrorKind>) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::Rpc {
                method,
                code: Some(payload.code),
                message: payload.message.to_string(),
                revert_data: extract_revert_data(payload),
            },
            None => Self::Rpc {
                method,
                code: None,
                message: rpc_error_message(err),
                revert_data: None,
            },
        }
    }

    pub fn contract(method: &'static str, err: &ContractError) -> Self {
        match err {
            ContractError::TransportError(inner) => {
                let mut converted = Self::rpc(method, inner);
                if let Self::Rpc { revert_data, .. } = &mut converted
                    && revert_data.is_none()
                {
                    *revert_data = err.as_revert_data();
                }
                converted
            }
            _ => Self::Rpc {
                method,
                code: None,
                message: err.to_string(),
                revert_data: err.as_revert_data(),
            },
        }
    }

    /// JSON-RPC error code, when the node answered with an error object.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => *code,
            _ => None,
        }
    }

    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            Self::Rpc { revert_data, .. } => revert_data.as_ref(),
            _ => None,
        }
    }

    /// The upstream message without any local prefix.
    pub fn provider_message(&self) -> String {
        match self {
            Self::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Human-readable revert reason carried by this error, if any.
    pub fn revert_reason(&self) -> Option<String> {
        let Self::Rpc {
            message,
            revert_data,
            ..
        } = self
        else {
            return None;
        };

        revert_data
            .as_ref()
            .filter(|data| !data.is_empty())
            .map(revert_reason)
            .or_else(|| revert_reason_from_message(message))
    }
}
