use std::{num::NonZeroUsize, sync::Arc};

use alloy::{
    network::{Ethereum, EthereumWallet},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::client::RpcClient,
    transports::{
        BoxTransport, IntoBoxTransport,
        http::{Http, reqwest::Url},
        layers::FallbackLayer,
    },
};
use dapp_domain::ChainId;
use tower::ServiceBuilder;

use crate::BlockchainError;

pub(crate) type BlockchainProvider = Arc<DynProvider<Ethereum>>;

/// Connect to every usable endpoint and put them behind a failover transport.
///
/// With a wallet, transactions are signed locally; without one they are
/// forwarded to the node as `eth_sendTransaction`.
pub(crate) async fn initialize_provider(
    chain_id: ChainId,
    rpc_endpoints: &[String],
    wallet: Option<EthereumWallet>,
) -> Result<BlockchainProvider, BlockchainError> {
    let mut transports: Vec<BoxTransport> = Vec::new();
    let mut valid_endpoints = Vec::new();

    for endpoint in rpc_endpoints {
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            match RpcClient::connect_pubsub(WsConnect::new(endpoint)).await {
                Ok(client) => {
                    transports.push(client.transport().clone().into_box_transport());
                    valid_endpoints.push(endpoint.clone());
                }
                Err(e) => {
                    tracing::warn!(%chain_id, endpoint = %endpoint, error = %e, "Failed to connect to WebSocket RPC");
                }
            }
        } else {
            match endpoint.parse::<Url>() {
                Ok(url) => {
                    transports.push(Http::new(url).into_box_transport());
                    valid_endpoints.push(endpoint.clone());
                }
                Err(e) => {
                    tracing::warn!(%chain_id, endpoint = %endpoint, error = %e, "Invalid RPC URL");
                }
            }
        }
    }

    if transports.is_empty() {
        return Err(BlockchainError::RpcConnectionFailed {
            attempts: rpc_endpoints.len(),
        });
    }

    // One active transport at a time: pure failover ranked by latency and success rate.
    let fallback_layer = FallbackLayer::default().with_active_transport_count(NonZeroUsize::MIN);
    let transport = ServiceBuilder::new()
        .layer(fallback_layer)
        .service(transports);
    let client = RpcClient::builder().transport(transport, false);

    let provider = match wallet {
        Some(wallet) => ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(client)
            .erased(),
        None => ProviderBuilder::new().connect_client(client).erased(),
    };

    match provider.get_block_number().await {
        Ok(block) => {
            tracing::info!(
                %chain_id,
                block,
                endpoints = ?valid_endpoints,
                "Chain provider initialized"
            );
            Ok(Arc::new(provider))
        }
        Err(e) => {
            tracing::error!(%chain_id, error = %e, "All RPC endpoints failed connectivity check");
            Err(BlockchainError::RpcConnectionFailed {
                attempts: valid_endpoints.len(),
            })
        }
    }
}
