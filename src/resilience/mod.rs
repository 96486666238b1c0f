//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Chain operation:
//!     → retries.rs (classify error, decide whether to try again)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Every retry loop is bounded
//! - Jittered backoff keeps many accounts from hammering a recovering node in step
//! - Per-call deadlines live in the RPC client, not here

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
