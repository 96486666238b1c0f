//! Commit-reveal hashing.
//!
//! `commitment = keccak256(keccak256(name) ‖ secret)`, the packed encoding of
//! two `bytes32` values. The secret is revealed only by the register call.

use alloy::primitives::{keccak256, B256};
use rand::rngs::OsRng;
use rand::RngCore;

/// Fresh 32-byte secret from the OS RNG.
pub fn generate_secret() -> B256 {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    B256::from(bytes)
}

pub fn name_hash(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

pub fn commitment_hash(name_hash: B256, secret: B256) -> B256 {
    let mut packed = [0u8; 64];
    packed[..32].copy_from_slice(name_hash.as_slice());
    packed[32..].copy_from_slice(secret.as_slice());
    keccak256(packed)
}

/// A name bound to a secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Commitment {
    pub name: String,
    pub name_hash: B256,
    pub secret: B256,
    pub commitment: B256,
}

impl Commitment {
    /// Commit to `name` with a fresh secret.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_secret(name, generate_secret())
    }

    pub fn with_secret(name: impl Into<String>, secret: B256) -> Self {
        let name = name.into();
        let name_hash = name_hash(&name);
        Self {
            commitment: commitment_hash(name_hash, secret),
            name,
            name_hash,
            secret,
        }
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commitment")
            .field("name", &self.name)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}
