//! Commit/register name minting and wrapped-token operations for an EVM
//! testnet, run across several accounts.

pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod runner;
pub mod tokens;

pub use config::schema::MinterConfig;
pub use lifecycle::Shutdown;
pub use registry::{MintOrchestrator, MintOutcome};
