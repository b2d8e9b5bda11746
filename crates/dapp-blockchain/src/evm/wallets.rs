use alloy::{
    network::EthereumWallet,
    signers::local::{LocalSignerError, PrivateKeySigner},
};

use crate::BlockchainError;

pub(crate) fn wallet_from_private_key(private_key: &str) -> Result<EthereumWallet, BlockchainError> {
    let signer: PrivateKeySigner =
        private_key
            .parse()
            .map_err(|e: LocalSignerError| BlockchainError::InvalidPrivateKey {
                key_length: private_key.len(),
                source: e,
            })?;
    Ok(EthereumWallet::from(signer))
}
