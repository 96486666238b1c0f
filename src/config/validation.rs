//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Endpoint URLs and contract addresses parse
//! - Ranges are ordered and timeouts are positive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MinterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::MinterConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and collect the failures.
pub fn validate_config(config: &MinterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let endpoints = config.network.endpoint_candidates();
    if endpoints.is_empty() {
        errors.push(ValidationError::new("network.rpc_url", "at least one RPC endpoint is required"));
    }
    for url in endpoints {
        if url.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new("network.rpc_url", format!("invalid URL '{url}'")));
        }
    }
    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than zero"));
    }

    if config.registry.contract_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "registry.contract_address",
            format!("invalid address '{}'", config.registry.contract_address),
        ));
    }
    if config.token.wrapped_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "token.wrapped_address",
            format!("invalid address '{}'", config.token.wrapped_address),
        ));
    }

    let registry = &config.registry;
    if registry.name_min_len == 0 || registry.name_min_len > registry.name_max_len {
        errors.push(ValidationError::new(
            "registry.name_min_len",
            "must be positive and not exceed name_max_len",
        ));
    }
    if registry.candidates_per_attempt == 0 {
        errors.push(ValidationError::new("registry.candidates_per_attempt", "must be greater than zero"));
    }
    if registry.max_attempts == 0 {
        errors.push(ValidationError::new("registry.max_attempts", "must be greater than zero"));
    }
    if registry.commit_timeout_secs == 0 || registry.register_timeout_secs == 0 {
        errors.push(ValidationError::new("registry.timeouts", "receipt timeouts must be greater than zero"));
    }

    let gas = &config.gas;
    if gas.markup_min <= 0.0 || gas.markup_min > gas.markup_max {
        errors.push(ValidationError::new("gas.markup_min", "must be positive and not exceed markup_max"));
    }
    if gas.history_size == 0 {
        errors.push(ValidationError::new("gas.history_size", "must be greater than zero"));
    }
    if gas.underpriced_bump < 1.0 {
        errors.push(ValidationError::new("gas.underpriced_bump", "must be at least 1.0"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be greater than zero"));
    }
    if retries.jitter_min <= 0.0 || retries.jitter_min > retries.jitter_max {
        errors.push(ValidationError::new("retries.jitter_min", "must be positive and not exceed jitter_max"));
    }
    if config.submitter.max_send_attempts == 0 {
        errors.push(ValidationError::new("submitter.max_send_attempts", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
