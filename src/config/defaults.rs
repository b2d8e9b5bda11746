//! Typed default configurations for each environment.
//!
//! Each environment (development, testnet, mainnet) gets a fully constructed
//! [`ConfigRaw`] via [`config_for`]; files and environment variables are
//! merged on top by the loader.

use dapp_blockchain::{ChainConfigRaw, ChainsConfigRaw};
use dapp_domain::ChainId;

use super::{ConfigError, ConfigRaw, TrackerConfig};
use crate::logger::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig};

/// Returns the default [`ConfigRaw`] for the given environment name.
pub(crate) fn config_for(environment: &str) -> Result<ConfigRaw, ConfigError> {
    match environment {
        "development" => Ok(development()),
        "testnet" => Ok(testnet()),
        "mainnet" => Ok(mainnet()),
        _ => Err(ConfigError::UnknownEnvironment(environment.to_string())),
    }
}

fn telemetry(enabled: bool) -> TelemetryConfig {
    TelemetryConfig {
        metrics: TelemetryMetricsConfig {
            enabled,
            bind_address: "127.0.0.1:9464".to_string(),
        },
    }
}

fn chain(chain_id: u64, rpc_endpoint: &str, enabled: bool) -> ChainConfigRaw {
    ChainConfigRaw {
        enabled,
        ..ChainConfigRaw::new(ChainId::new(chain_id), vec![rpc_endpoint.to_string()])
    }
}

fn chains(entries: impl IntoIterator<Item = (&'static str, ChainConfigRaw)>) -> ChainsConfigRaw {
    ChainsConfigRaw(
        entries
            .into_iter()
            .map(|(name, chain)| (name.to_string(), chain))
            .collect(),
    )
}

fn development() -> ConfigRaw {
    ConfigRaw {
        environment: "development".to_string(),
        chains: chains([(
            "anvil",
            ChainConfigRaw {
                poll_interval_ms: 1_000,
                ..chain(31337, "http://127.0.0.1:8545", true)
            },
        )]),
        tracker: TrackerConfig::default(),
        watch: Vec::new(),
        logger: LoggerConfig {
            level: "dapp_engine=debug,dapp_multicall=debug,dapp_transactions=debug".to_string(),
            format: LogFormat::Pretty,
        },
        telemetry: telemetry(false),
    }
}

fn testnet() -> ConfigRaw {
    ConfigRaw {
        environment: "testnet".to_string(),
        chains: chains([
            (
                "sepolia",
                chain(11155111, "https://ethereum-sepolia-rpc.publicnode.com", true),
            ),
            (
                "arbitrum_sepolia",
                chain(421614, "https://sepolia-rollup.arbitrum.io/rpc", false),
            ),
        ]),
        tracker: TrackerConfig::default(),
        watch: Vec::new(),
        logger: LoggerConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
        telemetry: telemetry(false),
    }
}

fn mainnet() -> ConfigRaw {
    ConfigRaw {
        environment: "mainnet".to_string(),
        chains: chains([
            (
                "ethereum",
                ChainConfigRaw {
                    max_rpc_requests_per_second: Some(25),
                    ..chain(1, "https://ethereum-rpc.publicnode.com", true)
                },
            ),
            (
                "arbitrum",
                ChainConfigRaw {
                    poll_interval_ms: 1_000,
                    blocks_per_fetch: 4,
                    ..chain(42161, "https://arb1.arbitrum.io/rpc", false)
                },
            ),
            (
                "polygon",
                ChainConfigRaw {
                    poll_interval_ms: 2_000,
                    ..chain(137, "https://polygon-rpc.com", false)
                },
            ),
        ]),
        tracker: TrackerConfig::default(),
        watch: Vec::new(),
        logger: LoggerConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
        },
        telemetry: telemetry(true),
    }
}
