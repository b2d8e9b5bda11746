use std::{
    collections::{BTreeMap, HashSet},
    time::Duration,
};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use dapp_domain::ChainId;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, MULTICALL3_ADDRESS};

const DEFAULT_BLOCKS_PER_FETCH: u64 = 1;
const DEFAULT_BATCH_GAS_LIMIT: u64 = 50_000_000;
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 4_000;
const DEFAULT_GAS_MARGIN_BPS: u64 = 2_000;
const DEFAULT_RPC_MAX_ATTEMPTS: usize = 3;

/// Settings for one chain, as read from configuration files.
///
/// **Secret handling**: the signer key may be set here or through the
/// `SIGNER_PRIVATE_KEY` environment variable (applied by the config loader).
/// Without a key, transactions are handed to the node's `eth_sendTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfigRaw {
    /// Disabled entries are ignored during config resolution.
    #[serde(default)]
    pub enabled: bool,

    pub chain_id: ChainId,

    /// HTTP or WebSocket endpoints; more than one enables failover.
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,

    /// Multicall3 deployment. Defaults to the canonical cross-chain address.
    #[serde(default)]
    pub multicall_address: Option<String>,

    #[serde(default)]
    pub signer_private_key: Option<String>,

    /// Common values: 25 (free tier), 50-100 (paid tier), None (unlimited).
    #[serde(default)]
    pub max_rpc_requests_per_second: Option<u32>,

    #[serde(default = "default_rpc_max_attempts")]
    pub rpc_max_attempts: usize,

    /// Default refresh cadence for reads that do not ask for their own.
    #[serde(default = "default_blocks_per_fetch")]
    pub blocks_per_fetch: u64,

    /// Gas budget of one aggregated read.
    #[serde(default = "default_batch_gas_limit")]
    pub batch_gas_limit: u64,

    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// How often the block watcher polls for a new head.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Safety margin added to gas estimates, in basis points.
    #[serde(default = "default_gas_margin_bps")]
    pub gas_margin_bps: u64,
}

fn default_blocks_per_fetch() -> u64 {
    DEFAULT_BLOCKS_PER_FETCH
}

fn default_batch_gas_limit() -> u64 {
    DEFAULT_BATCH_GAS_LIMIT
}

fn default_batch_timeout_ms() -> u64 {
    DEFAULT_BATCH_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_gas_margin_bps() -> u64 {
    DEFAULT_GAS_MARGIN_BPS
}

fn default_rpc_max_attempts() -> usize {
    DEFAULT_RPC_MAX_ATTEMPTS
}

impl ChainConfigRaw {
    /// A chain entry with every tunable at its default.
    pub fn new(chain_id: ChainId, rpc_endpoints: Vec<String>) -> Self {
        Self {
            enabled: true,
            chain_id,
            rpc_endpoints,
            multicall_address: None,
            signer_private_key: None,
            max_rpc_requests_per_second: None,
            rpc_max_attempts: DEFAULT_RPC_MAX_ATTEMPTS,
            blocks_per_fetch: DEFAULT_BLOCKS_PER_FETCH,
            batch_gas_limit: DEFAULT_BATCH_GAS_LIMIT,
            batch_timeout_ms: DEFAULT_BATCH_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            gas_margin_bps: DEFAULT_GAS_MARGIN_BPS,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ensures at least one RPC endpoint is configured.
    pub fn ensure_rpc_endpoints(&self) -> Result<(), ConfigError> {
        if self.rpc_endpoints.is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "chain {}: rpc_endpoints must include at least one endpoint",
                self.chain_id
            )));
        }
        Ok(())
    }

    /// Ensures the RPC rate limit, if configured, is greater than zero.
    pub fn ensure_max_rpc_requests_per_second(&self) -> Result<(), ConfigError> {
        if self.max_rpc_requests_per_second == Some(0) {
            return Err(ConfigError::InvalidConfig(format!(
                "chain {}: max_rpc_requests_per_second must be greater than 0 when set",
                self.chain_id
            )));
        }
        Ok(())
    }

    /// Ensures counters and durations that drive loops are non-zero.
    pub fn ensure_positive_tunables(&self) -> Result<(), ConfigError> {
        let checks = [
            ("blocks_per_fetch", self.blocks_per_fetch),
            ("batch_gas_limit", self.batch_gas_limit),
            ("batch_timeout_ms", self.batch_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("rpc_max_attempts", self.rpc_max_attempts as u64),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "chain {}: {name} must be greater than 0",
                    self.chain_id
                )));
            }
        }
        Ok(())
    }

    pub fn resolve(self) -> Result<ChainConfig, ConfigError> {
        self.ensure_rpc_endpoints()?;
        self.ensure_max_rpc_requests_per_second()?;
        self.ensure_positive_tunables()?;

        let multicall_address = match self.multicall_address.as_deref() {
            Some(address) => parse_evm_address(address)?,
            None => MULTICALL3_ADDRESS,
        };

        let signer_address = self
            .signer_private_key
            .as_deref()
            .map(derive_evm_address_from_private_key)
            .transpose()?;

        Ok(ChainConfig {
            chain_id: self.chain_id,
            rpc_endpoints: self.rpc_endpoints,
            multicall_address,
            signer_private_key: self.signer_private_key,
            signer_address,
            max_rpc_requests_per_second: self.max_rpc_requests_per_second,
            rpc_max_attempts: self.rpc_max_attempts,
            blocks_per_fetch: self.blocks_per_fetch,
            batch_gas_limit: self.batch_gas_limit,
            batch_timeout: Duration::from_millis(self.batch_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            gas_margin_bps: self.gas_margin_bps,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub rpc_endpoints: Vec<String>,
    pub multicall_address: Address,
    pub signer_private_key: Option<String>,
    pub signer_address: Option<Address>,
    pub max_rpc_requests_per_second: Option<u32>,
    pub rpc_max_attempts: usize,
    pub blocks_per_fetch: u64,
    pub batch_gas_limit: u64,
    pub batch_timeout: Duration,
    pub poll_interval: Duration,
    pub gas_margin_bps: u64,
}

fn parse_evm_address(value: &str) -> Result<Address, ConfigError> {
    value
        .parse::<Address>()
        .map_err(|e| ConfigError::InvalidConfig(format!("invalid EVM address '{}': {}", value, e)))
}

fn derive_evm_address_from_private_key(private_key: &str) -> Result<Address, ConfigError> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| ConfigError::MissingSecret(format!("invalid signer private key: {}", e)))?;
    Ok(signer.address())
}

/// Chains keyed by a free-form name (`[chains.mainnet]`, `[chains.polygon]`).
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChainsConfigRaw(pub BTreeMap<String, ChainConfigRaw>);

impl ChainsConfigRaw {
    pub fn resolve(self) -> Result<ChainsConfig, ConfigError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.0.len());
        for (name, config) in self.0 {
            if !config.is_enabled() {
                continue;
            }

            if !seen.insert(config.chain_id) {
                return Err(ConfigError::InvalidConfig(format!(
                    "chain '{}' reuses chain_id {} from another enabled entry",
                    name, config.chain_id
                )));
            }

            resolved.push(config.resolve()?);
        }
        if resolved.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "no enabled chains configured".to_string(),
            ));
        }
        Ok(ChainsConfig(resolved))
    }
}

#[derive(Debug, Clone)]
pub struct ChainsConfig(pub Vec<ChainConfig>);

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_raw(max_rpc_requests_per_second: Option<u32>) -> ChainConfigRaw {
        ChainConfigRaw {
            max_rpc_requests_per_second,
            ..ChainConfigRaw::new(
                ChainId::new(31337),
                vec!["http://localhost:8545".to_string()],
            )
        }
    }

    #[test]
    fn resolve_rejects_zero_rpc_rate_limit() {
        let result = sample_raw(Some(0)).resolve();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfig(ref msg))
                if msg.contains("max_rpc_requests_per_second")
        ));
    }

    #[test]
    fn resolve_defaults_multicall_address() {
        let resolved = sample_raw(Some(10)).resolve().unwrap();
        assert_eq!(resolved.multicall_address, MULTICALL3_ADDRESS);
        assert_eq!(resolved.max_rpc_requests_per_second, Some(10));
        assert_eq!(resolved.gas_margin_bps, 2_000);
        assert_eq!(resolved.signer_address, None);
    }

    #[test]
    fn resolve_rejects_missing_rpc_endpoints() {
        let mut config = sample_raw(None);
        config.rpc_endpoints = vec![];

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidConfig(ref msg))
                if msg.contains("rpc_endpoints must include at least one endpoint")
        ));
    }

    #[test]
    fn resolve_rejects_zero_cadence() {
        let mut config = sample_raw(None);
        config.blocks_per_fetch = 0;

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidConfig(ref msg)) if msg.contains("blocks_per_fetch")
        ));
    }

    #[test]
    fn resolve_derives_signer_address() {
        let mut config = sample_raw(None);
        config.signer_private_key =
            Some("449bf49be49946f2160d288a56e820adc5808806d558f33a2412783a61aad3d7".to_string());

        let resolved = config.resolve().unwrap();
        assert!(resolved.signer_address.is_some());

        let mut bad = sample_raw(None);
        bad.signer_private_key = Some("not-a-key".to_string());
        assert!(matches!(bad.resolve(), Err(ConfigError::MissingSecret(_))));
    }

    #[test]
    fn chains_resolve_skips_disabled_and_rejects_duplicates() {
        let mut disabled = sample_raw(None);
        disabled.enabled = false;
        disabled.rpc_endpoints.clear();

        let chains = ChainsConfigRaw(BTreeMap::from([
            ("local".to_string(), sample_raw(None)),
            ("off".to_string(), disabled),
        ]));
        assert_eq!(chains.resolve().unwrap().0.len(), 1);

        let duplicated = ChainsConfigRaw(BTreeMap::from([
            ("a".to_string(), sample_raw(None)),
            ("b".to_string(), sample_raw(None)),
        ]));
        assert!(duplicated.resolve().is_err());

        assert!(ChainsConfigRaw::default().resolve().is_err());
    }
}
