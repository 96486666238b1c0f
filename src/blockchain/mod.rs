//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private keys, RPC URLs)
//!     → wallet.rs (key loading, signing)
//!     → client.rs (endpoint selection, failover, timeouts)
//!     → gas.rs / nonce.rs (pricing and sequencing)
//!     → transaction.rs (build, sign, broadcast, confirm)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or commitment secrets
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod gas;
pub mod nonce;
pub mod rpc;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{BlockchainClient, SessionHeaders};
pub use gas::GasOracle;
pub use nonce::NonceTracker;
pub use rpc::ChainRpc;
pub use transaction::{Broadcast, SubmittedTx, TxIntent, TxSubmitter};
pub use types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId, ConfirmationStatus};
pub use wallet::Wallet;
