//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: RPC_URL, CHAIN_ID, ...)
//!     → validation.rs (semantic checks)
//!     → MinterConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow running with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::BlockchainConfig;
pub use schema::GasConfig;
pub use schema::MinterConfig;
pub use schema::RegistryConfig;
pub use schema::RetryConfig;
