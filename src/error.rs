use dapp_blockchain::BlockchainError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Chain {chain_id} failed to initialize: {source}")]
    ChainInit {
        chain_id: dapp_domain::ChainId,
        #[source]
        source: BlockchainError,
    },

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}
