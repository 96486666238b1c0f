//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::MinterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load the config file if given (defaults otherwise), apply environment
/// overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<MinterConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => MinterConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `RPC_URL`-style overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut MinterConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = get("RPC_URL") {
        config.network.rpc_url = url;
    }
    let fallbacks: Vec<String> = ["RPC_URL_FALLBACK_1", "RPC_URL_FALLBACK_2"]
        .iter()
        .filter_map(|key| get(key))
        .collect();
    if !fallbacks.is_empty() {
        config.network.failover_urls = fallbacks;
    }
    if let Some(raw) = get("CHAIN_ID") {
        config.network.chain_id = raw.parse().map_err(|_| ConfigError::Env {
            var: "CHAIN_ID",
            value: raw.clone(),
        })?;
    }
    if let Some(address) = get("CONTRACT_ADDRESS") {
        config.registry.contract_address = address;
    }
    if let Some(address) = get("WRAPPED_TOKEN_ADDRESS") {
        config.token.wrapped_address = address;
    }
    if let Some(url) = get("EXPLORER_BASE_URL") {
        config.network.explorer_base_url = url;
    }

    Ok(())
}
