//! Name-service registration.
//!
//! # Data Flow
//! ```text
//! names.rs (random candidates)
//!     → contract.rs (availability, fee, commitment age)
//!     → commitment.rs (secret, name hash, commitment)
//!     → orchestrator.rs (commit → mature → recheck → register → confirm)
//! ```
//!
//! # Security Constraints
//! - Commitment secrets are never logged
//! - The secret is only revealed by the register transaction

pub mod commitment;
pub mod contract;
pub mod names;
pub mod orchestrator;

pub use commitment::Commitment;
pub use contract::{INameRegistry, RegistryClient};
pub use orchestrator::{MintOrchestrator, MintOutcome, MintPhase};
