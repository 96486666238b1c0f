//! Local nonce tracking.
//!
//! The node's pending count can lag behind transactions this process just
//! broadcast, so the tracker never hands out a nonce below the last one used.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Next-nonce bookkeeping for one account.
#[derive(Debug, Clone, Default)]
pub struct NonceTracker {
    /// Lowest nonce this process has not handed out yet.
    next: Arc<AtomicU64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a nonce given the chain's pending count, if it could be read.
    pub fn reserve(&self, chain_pending: Option<u64>) -> u64 {
        let local = self.next.load(Ordering::SeqCst);
        let nonce = match chain_pending {
            Some(chain) if chain < local => {
                tracing::debug!(nonce = local, chain_pending = chain, "Using tracked nonce");
                local
            }
            Some(chain) => chain,
            None => {
                tracing::warn!(nonce = local, "Pending nonce unavailable, using tracked nonce");
                local
            }
        };
        self.next.fetch_max(nonce + 1, Ordering::SeqCst);
        nonce
    }

    /// Give back a nonce that was never broadcast.
    ///
    /// Only the most recent reservation can be returned; older ones are kept
    /// so the sequence has no gap.
    pub fn release(&self, nonce: u64) {
        let _ = self
            .next
            .compare_exchange(nonce + 1, nonce, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Forget local state and trust the chain's count.
    pub fn resync(&self, chain_pending: u64) {
        tracing::info!(chain_pending, "Resyncing nonce from chain");
        self.next.store(chain_pending, Ordering::SeqCst);
    }

    /// Next nonce that would be handed out without chain input.
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
