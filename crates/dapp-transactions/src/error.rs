use dapp_domain::{ChainId, TxHash};

/// A transaction could not be assembled. Nothing was sent to the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("No account connected")]
    MissingAccount,

    #[error("No contract deployed for '{0}' on this chain")]
    MissingContract(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Gas estimation failed: {message}")]
    EstimationFailed { message: String },

    /// The replayed call reverted. Displays exactly the decoded reason.
    #[error("{reason}")]
    SimulatedRevert { reason: String },

    #[error("Transaction cancelled by user")]
    UserCancelled,

    #[error("Transaction failed: {message}")]
    TransactionFailed { message: String },

    #[error("Network failure: {message}")]
    NetworkFailure { message: String },
}

impl TxError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::EstimationFailed { .. } => "estimation_failed",
            Self::SimulatedRevert { .. } => "simulated_revert",
            Self::UserCancelled => "user_cancelled",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::NetworkFailure { .. } => "network_failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    #[error("Transaction {hash} is already tracked on chain {chain_id}")]
    AlreadyTracked { chain_id: ChainId, hash: TxHash },
}
