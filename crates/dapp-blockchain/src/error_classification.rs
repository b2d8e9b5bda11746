use std::time::Duration;

use alloy::{
    contract::Error as ContractError,
    transports::{RpcError, TransportErrorKind},
};

use crate::BlockchainError;

/// EIP-1193 "user rejected request".
pub const USER_REJECTION_CODE: i64 = 4001;

const USER_REJECTION_PATTERNS: [&str; 5] = [
    "user rejected",
    "user denied",
    "rejected by user",
    "user cancelled",
    "action_rejected",
];

pub fn is_retryable_rpc_error(err: &RpcError<TransportErrorKind>) -> bool {
    match err {
        RpcError::Transport(kind) => match kind {
            TransportErrorKind::MissingBatchResponse(_) => true,
            TransportErrorKind::BackendGone => true,
            TransportErrorKind::HttpError(http) => {
                http.is_rate_limit_err() || http.is_temporarily_unavailable()
            }
            TransportErrorKind::Custom(custom) => {
                let msg = custom.to_string().to_ascii_lowercase();
                msg.contains("too many requests") || msg.contains("rate limit")
            }
            _ => false,
        },
        RpcError::ErrorResp(payload) => payload.is_retry_err(),
        RpcError::NullResp => true,
        RpcError::DeserError { text, .. } => {
            let lowered = text.to_ascii_lowercase();
            lowered.contains("rate limit")
                || lowered.contains("too many requests")
                || lowered.contains("request limit")
        }
        _ => false,
    }
}

pub fn should_refresh_rpc_error(err: &RpcError<TransportErrorKind>) -> bool {
    matches!(
        err,
        RpcError::Transport(TransportErrorKind::BackendGone)
            | RpcError::Transport(TransportErrorKind::PubsubUnavailable)
    )
}

pub fn rpc_backoff_hint(err: &RpcError<TransportErrorKind>) -> Option<Duration> {
    let RpcError::ErrorResp(payload) = err else {
        return None;
    };

    let data = payload.try_data_as::<serde_json::Value>()?;
    let Ok(data) = data else {
        return None;
    };

    let backoff_seconds = data["rate"]["backoff_seconds"].as_f64()?;
    Some(Duration::from_secs(backoff_seconds.ceil() as u64))
}

pub fn is_retryable_contract_error(err: &ContractError) -> bool {
    if err.as_revert_data().is_some() {
        return false;
    }

    match err {
        ContractError::TransportError(inner) => is_retryable_rpc_error(inner),
        _ => false,
    }
}

pub fn contract_error_backoff_hint(err: &ContractError) -> Option<Duration> {
    match err {
        ContractError::TransportError(inner) => rpc_backoff_hint(inner),
        _ => None,
    }
}

pub fn should_refresh_contract_error(err: &ContractError) -> bool {
    match err {
        ContractError::TransportError(inner) => should_refresh_rpc_error(inner),
        _ => false,
    }
}

/// Whether a submission failed because the signer declined it.
pub fn is_user_rejection(err: &BlockchainError) -> bool {
    if err.rpc_code() == Some(USER_REJECTION_CODE) {
        return true;
    }

    let message = err.provider_message().to_ascii_lowercase();
    USER_REJECTION_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// Whether the request never got a JSON-RPC answer (timeouts, dead endpoints,
/// transport errors).
pub fn is_network_failure(err: &BlockchainError) -> bool {
    match err {
        BlockchainError::Timeout { .. }
        | BlockchainError::RpcConnectionFailed { .. }
        | BlockchainError::ProviderInit { .. } => true,
        BlockchainError::Rpc {
            code, revert_data, ..
        } => code.is_none() && revert_data.is_none(),
        _ => false,
    }
}

pub(crate) fn rpc_error_message(err: &RpcError<TransportErrorKind>) -> String {
    match err {
        RpcError::ErrorResp(payload) => payload.message.to_string(),
        RpcError::Transport(TransportErrorKind::HttpError(http)) => http.body.clone(),
        RpcError::Transport(TransportErrorKind::Custom(custom)) => custom.to_string(),
        RpcError::DeserError { text, .. } => text.clone(),
        _ => err.to_string(),
    }
}
