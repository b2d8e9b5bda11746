use alloy::primitives::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The call returned no data at a known block.
    #[error("Call reverted")]
    Reverted,

    #[error("Failed to decode call result: {reason}")]
    Malformed { reason: String, data: Bytes },
}

/// Consumer-facing view of a call, derived from a [`CallResult`](crate::CallResult).
#[derive(Debug, Clone, PartialEq)]
pub enum CallState<T> {
    /// No chain or contract to read from.
    Invalid,
    Loading,
    /// Decoded, but older than the chain's current sync point.
    Syncing(T),
    Error(DecodeError),
    Success(T),
}

impl<T> CallState<T> {
    /// Decoded value, also available while syncing.
    pub fn result(&self) -> Option<&T> {
        match self {
            Self::Syncing(value) | Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing(_))
    }

    pub fn error(&self) -> Option<&DecodeError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallState<U> {
        match self {
            Self::Invalid => CallState::Invalid,
            Self::Loading => CallState::Loading,
            Self::Syncing(value) => CallState::Syncing(f(value)),
            Self::Error(error) => CallState::Error(error),
            Self::Success(value) => CallState::Success(f(value)),
        }
    }
}
