//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the minter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MinterConfig {
    /// Network endpoints and chain settings.
    pub network: BlockchainConfig,

    /// Gas price oracle settings.
    pub gas: GasConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Transaction submission settings.
    pub submitter: SubmitterConfig,

    /// Name-service registry and minting flow.
    pub registry: RegistryConfig,

    /// Wrapped native token.
    pub token: TokenConfig,

    /// Multi-account runner.
    pub runner: RunnerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Primary JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, in priority order.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Expected chain ID.
    pub chain_id: u64,

    /// Fail instead of adopting the network's chain ID on mismatch.
    pub strict_chain_id: bool,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of blocks a receipt must be buried under to count as confirmed.
    pub confirmation_blocks: u32,

    /// Explorer prefix for transaction links.
    pub explorer_base_url: String,

    /// User-Agent header sent to RPC endpoints.
    pub user_agent: String,
}

impl BlockchainConfig {
    /// Non-empty endpoint URLs, primary first.
    pub fn endpoint_candidates(&self) -> Vec<&str> {
        std::iter::once(self.rpc_url.as_str())
            .chain(self.failover_urls.iter().map(String::as_str))
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .collect()
    }
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://testnet.dplabs-internal.com".to_string(),
            failover_urls: Vec::new(),
            chain_id: 688688,
            strict_chain_id: false,
            rpc_timeout_secs: 120,
            confirmation_blocks: 1,
            explorer_base_url: "https://testnet.pharosscan.xyz/tx/".to_string(),
            user_agent: concat!("name-minter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fee fields to put on transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeMode {
    /// `gasPrice`.
    Legacy,
    /// `maxFeePerGas` / `maxPriorityFeePerGas` derived from the price.
    Eip1559,
}

/// Gas oracle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Lower bound of the random markup factor.
    pub markup_min: f64,

    /// Upper bound of the random markup factor.
    pub markup_max: f64,

    /// Final prices remembered for the historical median.
    pub history_size: usize,

    /// Extra sample always fed into the median, in gwei.
    pub reference_gas_price_gwei: Option<f64>,

    /// Price used when no source answers, in gwei.
    pub fallback_gas_price_gwei: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Multiplier applied per "underpriced" rejection.
    pub underpriced_bump: f64,

    /// Fee fields to use.
    pub fee_mode: FeeMode,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            markup_min: 1.05,
            markup_max: 1.10,
            history_size: 5,
            reference_gas_price_gwei: None,
            fallback_gas_price_gwei: 1.0,
            max_gas_price_gwei: 500,
            underpriced_bump: 1.15,
            fee_mode: FeeMode::Legacy,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts for reads.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor between attempts.
    pub backoff_factor: f64,

    /// Lower bound of the jitter multiplier.
    pub jitter_min: f64,

    /// Upper bound of the jitter multiplier.
    pub jitter_max: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_factor: 1.5,
            jitter_min: 0.8,
            jitter_max: 1.2,
        }
    }
}

/// Transaction submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Broadcast attempts per transaction.
    pub max_send_attempts: u32,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: 3,
            receipt_poll_interval_ms: 3000,
        }
    }
}

/// Name-service registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry contract address.
    pub contract_address: String,

    /// Suffix appended to generated names.
    pub tld: String,

    /// Shortest generated label.
    pub name_min_len: usize,

    /// Longest generated label.
    pub name_max_len: usize,

    /// Names checked per attempt.
    pub candidates_per_attempt: usize,

    /// Commit/register rounds before giving up.
    pub max_attempts: u32,

    /// Lower bound on the maturation wait in seconds.
    pub min_commitment_floor_secs: u64,

    /// Added on top of the maturation wait in seconds.
    pub commitment_safety_margin_secs: u64,

    /// Used when `minCommitmentAge()` cannot be read.
    pub default_min_commitment_age_secs: u64,

    /// Used when `mintingFee()` cannot be read, in wei.
    pub default_minting_fee_wei: u128,

    /// Receipt deadline for commit transactions in seconds.
    pub commit_timeout_secs: u64,

    /// Receipt deadline for register transactions in seconds.
    pub register_timeout_secs: u64,

    /// Pause between failed attempts in milliseconds.
    pub attempt_delay_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            contract_address: "0x51be1ef20a1fd5179419738fc71d95a8b6f8a175".to_string(),
            tld: ".phrs".to_string(),
            name_min_len: 5,
            name_max_len: 8,
            candidates_per_attempt: 5,
            max_attempts: 5,
            min_commitment_floor_secs: 60,
            commitment_safety_margin_secs: 15,
            default_min_commitment_age_secs: 60,
            default_minting_fee_wei: 3_200_000_000_000_000, // 0.0032 ether
            commit_timeout_secs: 180,
            register_timeout_secs: 300,
            attempt_delay_ms: 1500,
        }
    }
}

/// Wrapped native token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// WETH9-style contract address.
    pub wrapped_address: String,

    /// Display symbol for the native token.
    pub native_symbol: String,

    /// Receipt deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            wrapped_address: "0x3019B247381c850ab53Dc0EE53bCe7A07Ea9155f".to_string(),
            native_symbol: "PHRS".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Multi-account runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Pause between accounts in seconds.
    pub account_delay_secs: u64,

    /// Highest `PRIVATE_KEY_n` index scanned.
    pub max_accounts: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            account_delay_secs: 15,
            max_accounts: 16,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
