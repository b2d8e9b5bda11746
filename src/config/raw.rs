use std::time::Duration;

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::Function,
    primitives::Address,
};
use dapp_blockchain::{ChainsConfig, ChainsConfigRaw};
use dapp_domain::{Call, ChainId};
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    logger::{LoggerConfig, TelemetryConfig},
};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigRaw {
    pub environment: String,
    pub chains: ChainsConfigRaw,
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Reads kept subscribed for the lifetime of the process and logged as
    /// they change.
    #[serde(default)]
    pub watch: Vec<WatchedCallConfig>,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub chains: ChainsConfig,
    pub tracker: TrackerConfig,
    pub watch: Vec<WatchedCall>,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

impl ConfigRaw {
    pub(crate) fn resolve(self) -> Result<Config, ConfigError> {
        let chains = self.chains.resolve()?;
        let watch = self
            .watch
            .into_iter()
            .map(|watched| watched.resolve(&chains))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            chains,
            tracker: self.tracker,
            watch,
            logger: self.logger,
            telemetry: self.telemetry,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct TrackerConfig {
    /// Drop unconfirmed transactions after this long. Unset keeps them until
    /// cleared.
    #[serde(default)]
    pub pending_ttl_secs: Option<u64>,
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,
}

fn default_expiry_interval_secs() -> u64 {
    60
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: None,
            expiry_interval_secs: default_expiry_interval_secs(),
        }
    }
}

impl TrackerConfig {
    pub(crate) fn pending_ttl(&self) -> Option<Duration> {
        self.pending_ttl_secs.map(Duration::from_secs)
    }

    pub(crate) fn expiry_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_interval_secs.max(1))
    }
}

/// A read declared in configuration, e.g.
///
/// ```toml
/// [[watch]]
/// chain_id = 1
/// label = "DAI supply"
/// target = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
/// signature = "function totalSupply() view returns (uint256)"
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct WatchedCallConfig {
    pub chain_id: ChainId,
    pub label: String,
    pub target: String,
    /// Human-readable ABI signature including return types.
    pub signature: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub gas_required: Option<u64>,
    #[serde(default)]
    pub blocks_per_fetch: Option<u64>,
}

#[derive(Debug, Clone)]
pub(crate) struct WatchedCall {
    pub chain_id: ChainId,
    pub label: String,
    pub call: Call,
    pub function: Function,
    pub blocks_per_fetch: Option<u64>,
}

impl WatchedCallConfig {
    fn invalid(&self, reason: impl std::fmt::Display) -> ConfigError {
        ConfigError::InvalidConfig(format!("watch '{}': {}", self.label, reason))
    }

    pub(crate) fn resolve(self, chains: &ChainsConfig) -> Result<WatchedCall, ConfigError> {
        if !chains.0.iter().any(|chain| chain.chain_id == self.chain_id) {
            return Err(self.invalid(format!("chain {} is not enabled", self.chain_id)));
        }
        if self.blocks_per_fetch == Some(0) {
            return Err(self.invalid("blocks_per_fetch must be greater than 0"));
        }

        let target: Address = self
            .target
            .parse()
            .map_err(|e| self.invalid(format!("invalid target '{}': {}", self.target, e)))?;
        let function = Function::parse(&self.signature)
            .map_err(|e| self.invalid(format!("invalid signature: {e}")))?;
        if function.inputs.len() != self.args.len() {
            return Err(self.invalid(format!(
                "expected {} argument(s), got {}",
                function.inputs.len(),
                self.args.len()
            )));
        }

        let values = function
            .inputs
            .iter()
            .zip(&self.args)
            .map(|(param, arg)| {
                let ty = param
                    .resolve()
                    .map_err(|e| self.invalid(format!("parameter '{}': {e}", param.name)))?;
                ty.coerce_str(arg)
                    .map_err(|e| self.invalid(format!("argument '{arg}': {e}")))
            })
            .collect::<Result<Vec<DynSolValue>, _>>()?;
        let call_data = function
            .abi_encode_input(&values)
            .map_err(|e| self.invalid(format!("encoding failed: {e}")))?;

        let mut call = Call::new(target, call_data);
        if let Some(gas) = self.gas_required {
            call = call.with_gas_required(gas);
        }

        Ok(WatchedCall {
            chain_id: self.chain_id,
            label: self.label,
            call,
            function,
            blocks_per_fetch: self.blocks_per_fetch,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::{primitives::address, sol, sol_types::SolCall};
    use dapp_blockchain::ChainConfigRaw;

    use super::*;

    sol! {
        function balanceOf(address owner) external view returns (uint256);
    }

    fn chains() -> ChainsConfig {
        let mut raw = ChainsConfigRaw::default();
        raw.0.insert(
            "local".to_string(),
            ChainConfigRaw::new(ChainId::new(31337), vec!["http://127.0.0.1:8545".to_string()]),
        );
        raw.resolve().unwrap()
    }

    fn watched(args: Vec<&str>) -> WatchedCallConfig {
        WatchedCallConfig {
            chain_id: ChainId::new(31337),
            label: "balance".to_string(),
            target: "0x6B175474E89094C44Da98b954EedeAC495271d0F".to_string(),
            signature: "function balanceOf(address owner) view returns (uint256)".to_string(),
            args: args.into_iter().map(str::to_string).collect(),
            gas_required: None,
            blocks_per_fetch: Some(5),
        }
    }

    #[test]
    fn watched_call_encodes_like_generated_bindings() {
        let owner = "0x00000000000000000000000000000000000000aa";
        let resolved = watched(vec![owner]).resolve(&chains()).unwrap();

        let expected = balanceOfCall {
            owner: address!("0x00000000000000000000000000000000000000aa"),
        }
        .abi_encode();
        assert_eq!(resolved.call.call_data.to_vec(), expected);
        assert_eq!(resolved.blocks_per_fetch, Some(5));
    }

    #[test]
    fn watched_call_validation() {
        assert!(watched(vec![]).resolve(&chains()).is_err());
        assert!(watched(vec!["not-an-address"]).resolve(&chains()).is_err());

        let mut other_chain = watched(vec!["0x00000000000000000000000000000000000000aa"]);
        other_chain.chain_id = ChainId::new(1);
        assert!(other_chain.resolve(&chains()).is_err());
    }
}
