//! Chain-specific types and error definitions.

use alloy::primitives::TxHash;
use thiserror::Error;

// Re-export BlockchainConfig from config module to avoid duplication
pub use crate::config::schema::BlockchainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Call or estimation was reverted by the contract.
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Nonce management error.
    #[error("Nonce error: {0}")]
    Nonce(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// The account cannot pay for value plus gas.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Return data could not be decoded against the expected ABI.
    #[error("Contract error: {0}")]
    Contract(String),
}

impl BlockchainError {
    /// Whether another attempt may succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BlockchainError::Rpc(_)
                | BlockchainError::Timeout(_)
                | BlockchainError::Reverted(_)
                | BlockchainError::Nonce(_)
        )
    }

    /// Map a node error message onto the closest variant.
    pub fn from_rpc_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("execution reverted") {
            BlockchainError::Reverted(message)
        } else if lower.contains("insufficient funds") {
            BlockchainError::InsufficientFunds(message)
        } else {
            BlockchainError::Rpc(message)
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Minimal view of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptInfo {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
    pub gas_used: u64,
}

/// Final state of a submitted transaction as observed by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Mined successfully with the required block depth.
    Confirmed { block_number: u64 },
    /// Mined but the execution failed.
    Reverted { block_number: u64 },
    /// No receipt before the deadline; the transaction may still land.
    Pending,
}

/// How a broadcast rejection should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Nonce already consumed; resync from chain.
    NonceTooLow,
    /// Fee too low for the pool or for replacement; bump and resend.
    Underpriced,
    /// Identical transaction is already in the pool.
    AlreadyKnown,
    /// Cannot pay for the transaction.
    InsufficientFunds,
    /// Connection problem or anything else worth another try.
    Transient,
}

impl SendFailure {
    /// Classify the error text a node returned for `eth_sendRawTransaction`.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("nonce too low") || lower.contains("nonce has already been used") {
            SendFailure::NonceTooLow
        } else if lower.contains("underpriced") || lower.contains("fee too low") {
            SendFailure::Underpriced
        } else if lower.contains("already known") || lower.contains("known transaction") {
            SendFailure::AlreadyKnown
        } else if lower.contains("insufficient funds") {
            SendFailure::InsufficientFunds
        } else {
            SendFailure::Transient
        }
    }
}
