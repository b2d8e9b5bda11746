use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use clap::{Arg, Command};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::Deserialize;

use super::{Config, ConfigRaw, defaults};
use crate::config::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const DEFAULT_ENVIRONMENT: &str = "development";
const ENV_PREFIX: &str = "DAPP_";
const SIGNER_PRIVATE_KEY_ENV: &str = "SIGNER_PRIVATE_KEY";

static CONFIG_ENV: OnceLock<String> = OnceLock::new();

#[derive(Debug, Deserialize)]
struct EnvironmentConfig {
    environment: Option<String>,
}

/// Returns the currently selected environment, or the default before
/// configuration has been loaded.
pub(crate) fn current_env() -> &'static str {
    CONFIG_ENV
        .get()
        .map(String::as_str)
        .unwrap_or(DEFAULT_ENVIRONMENT)
}

pub(crate) fn initialize_configuration() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let matches = Command::new("dapp-engine")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file (.toml format)"),
        )
        .get_matches();

    let custom_config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let signer_key = std::env::var(SIGNER_PRIVATE_KEY_ENV).ok();
    load_configuration(
        Path::new(DEFAULT_CONFIG_FILE),
        custom_config_path.as_deref(),
        signer_key,
    )
}

/// Layered load: typed defaults, then `base_path` if present, then the custom
/// file, then `DAPP_`-prefixed environment variables (`DAPP_TRACKER__PENDING_TTL_SECS`).
fn load_configuration(
    base_path: &Path,
    custom_config_path: Option<&Path>,
    signer_key: Option<String>,
) -> Result<Config, ConfigError> {
    let environment = resolve_environment(base_path, custom_config_path)?;
    let _ = CONFIG_ENV.set(environment.clone());

    tracing::debug!(%environment, "Loading configuration");

    let mut figment = Figment::from(Serialized::defaults(defaults::config_for(&environment)?));
    if base_path.exists() {
        figment = figment.merge(Toml::file(base_path));
    }
    if let Some(path) = custom_config_path {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let mut config: ConfigRaw = figment.extract().map_err(Box::new)?;
    if normalize_env(config.environment.clone()) != environment {
        return Err(ConfigError::UnknownEnvironment(format!(
            "config environment '{}' does not match selected '{}'",
            config.environment, environment
        )));
    }

    if let Some(key) = signer_key.filter(|key| !key.trim().is_empty()) {
        for chain in config.chains.0.values_mut() {
            if chain.signer_private_key.is_none() {
                chain.signer_private_key = Some(key.clone());
            }
        }
    }

    config.resolve()
}

fn resolve_environment(
    base_path: &Path,
    custom_config_path: Option<&Path>,
) -> Result<String, ConfigError> {
    if let Some(path) = custom_config_path
        && !path.exists()
    {
        return Err(ConfigError::MissingConfig(path.display().to_string()));
    }

    let from_file = custom_config_path
        .and_then(read_environment_from)
        .or_else(|| read_environment_from(base_path));
    let from_env = std::env::var(format!("{ENV_PREFIX}ENVIRONMENT")).ok();

    let environment = from_env
        .or(from_file)
        .map(normalize_env)
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    if !matches!(environment.as_str(), "development" | "testnet" | "mainnet") {
        return Err(ConfigError::UnknownEnvironment(environment));
    }
    Ok(environment)
}

fn read_environment_from(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }

    Figment::from(Toml::file(path))
        .extract::<EnvironmentConfig>()
        .ok()
        .and_then(|config| config.environment)
        .map(normalize_env)
}

fn normalize_env(env: String) -> String {
    env.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::fs;

    use dapp_domain::ChainId;

    use super::*;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn missing_files_fall_back_to_development() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_configuration(&dir.path().join("config.toml"), None, None).unwrap();
        assert_eq!(config.chains.0.len(), 1);
        assert_eq!(config.chains.0[0].chain_id, ChainId::new(31337));
        assert!(config.chains.0[0].signer_address.is_none());
    }

    #[test]
    fn custom_file_selects_environment_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("custom.toml");
        fs::write(
            &custom,
            r#"
                environment = "testnet"
                [chains.sepolia]
                chain_id = 11155111
                rpc_endpoints = ["https://sepolia.example.org"]
                blocks_per_fetch = 2

                [[watch]]
                chain_id = 11155111
                label = "supply"
                target = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
                signature = "function totalSupply() view returns (uint256)"
            "#,
        )
        .unwrap();

        let config =
            load_configuration(&dir.path().join("config.toml"), Some(&custom), None).unwrap();
        let sepolia = &config.chains.0[0];
        assert_eq!(sepolia.rpc_endpoints, vec!["https://sepolia.example.org"]);
        assert_eq!(sepolia.blocks_per_fetch, 2);
        assert_eq!(config.watch.len(), 1);
        assert_eq!(config.watch[0].call.call_data.len(), 4);
    }

    #[test]
    fn signer_key_from_environment_fills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_configuration(
            &dir.path().join("config.toml"),
            None,
            Some(DEV_KEY.to_string()),
        )
        .unwrap();
        assert_eq!(
            config.chains.0[0].signer_address.unwrap().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn missing_custom_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_configuration(
            &dir.path().join("config.toml"),
            Some(&dir.path().join("nope.toml")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfig(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("config.toml");
        fs::write(&base, "environment = \"development\"\nunexpected = 1\n").unwrap();
        assert!(load_configuration(&base, None, None).is_err());
    }
}
