//! Two-phase name minting.
//!
//! # Flow per attempt
//! ```text
//! Selecting → Committing → Maturing → Rechecking → Registering → Confirming
//! ```
//!
//! # Invariants
//! - `register` is only sent after the commit was broadcast and the full
//!   maturation wait has elapsed
//! - `register` reveals the same secret and owner that produced the commitment
//! - one `register` per commitment; a failed round starts over with a new name

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::TxSubmitter;
use crate::blockchain::types::{BlockchainError, ConfirmationStatus};
use crate::config::schema::RegistryConfig;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::registry::commitment::Commitment;
use crate::registry::contract::RegistryClient;
use crate::registry::names;

/// Interval between "still maturing" log lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Step of a mint attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintPhase {
    Selecting,
    Committing,
    Maturing,
    Rechecking,
    Registering,
    Confirming,
}

impl fmt::Display for MintPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MintPhase::Selecting => "selecting",
            MintPhase::Committing => "committing",
            MintPhase::Maturing => "maturing",
            MintPhase::Rechecking => "rechecking",
            MintPhase::Registering => "registering",
            MintPhase::Confirming => "confirming",
        };
        f.write_str(name)
    }
}

/// Result of one mint run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MintOutcome {
    Success {
        name: String,
        commit_tx: TxHash,
        register_tx: TxHash,
        explorer_url: String,
    },
    /// Register was broadcast but no receipt arrived in time.
    Pending {
        name: String,
        commit_tx: TxHash,
        register_tx: TxHash,
        explorer_url: String,
    },
    Failed {
        reason: String,
        commit_tx: Option<TxHash>,
    },
}

impl MintOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MintOutcome::Success { .. } => "success",
            MintOutcome::Pending { .. } => "pending",
            MintOutcome::Failed { .. } => "failed",
        }
    }
}

/// Why an attempt did not produce an outcome.
#[derive(Debug)]
struct AttemptFailure {
    reason: String,
    commit_tx: Option<TxHash>,
    /// Further attempts cannot succeed.
    fatal: bool,
}

impl AttemptFailure {
    fn retry(reason: impl Into<String>, commit_tx: Option<TxHash>) -> Self {
        Self {
            reason: reason.into(),
            commit_tx,
            fatal: false,
        }
    }

    fn fatal(reason: impl Into<String>, commit_tx: Option<TxHash>) -> Self {
        Self {
            reason: reason.into(),
            commit_tx,
            fatal: true,
        }
    }

    fn from_send(step: &str, error: BlockchainError, commit_tx: Option<TxHash>) -> Self {
        let reason = format!("{step} not sent: {error}");
        match error {
            BlockchainError::InsufficientFunds(_) | BlockchainError::Wallet(_) => {
                Self::fatal(reason, commit_tx)
            }
            _ => Self::retry(reason, commit_tx),
        }
    }
}

/// Drives commit/register rounds for one account.
pub struct MintOrchestrator<C: ChainRpc> {
    submitter: Arc<TxSubmitter<C>>,
    registry: Arc<RegistryClient<C>>,
    config: RegistryConfig,
    explorer_base_url: String,
    shutdown: ShutdownSignal,
}

impl<C: ChainRpc> MintOrchestrator<C> {
    pub fn new(
        submitter: Arc<TxSubmitter<C>>,
        registry: Arc<RegistryClient<C>>,
        config: RegistryConfig,
        explorer_base_url: impl Into<String>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            submitter,
            registry,
            config,
            explorer_base_url: explorer_base_url.into(),
            shutdown,
        }
    }

    /// Mint one name, retrying with fresh names up to `max_attempts` times.
    pub async fn mint(&self) -> MintOutcome {
        let owner = self.submitter.address();
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_commit = None;
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if self.shutdown.is_triggered() {
                last_reason = "interrupted".to_string();
                break;
            }

            tracing::info!(attempt, max_attempts, %owner, "Starting mint attempt");
            let failure = match self.attempt(attempt, owner).await {
                Ok(outcome) => return self.finish(outcome),
                Err(failure) => failure,
            };

            tracing::warn!(attempt, reason = %failure.reason, "Mint attempt failed");
            if failure.commit_tx.is_some() {
                last_commit = failure.commit_tx;
            }
            last_reason = failure.reason;
            if failure.fatal {
                break;
            }

            if attempt < max_attempts {
                let mut signal = self.shutdown.clone();
                if !signal
                    .sleep(Duration::from_millis(self.config.attempt_delay_ms))
                    .await
                {
                    last_reason = "interrupted".to_string();
                    break;
                }
            }
        }

        self.finish(MintOutcome::Failed {
            reason: last_reason,
            commit_tx: last_commit,
        })
    }

    async fn attempt(&self, attempt: u32, owner: Address) -> Result<MintOutcome, AttemptFailure> {
        // Selecting
        enter(attempt, MintPhase::Selecting);
        let name = self.select_name().await?;

        // Committing
        enter(attempt, MintPhase::Committing);
        let commitment = Commitment::new(name.as_str());
        let commit = self
            .submitter
            .submit(self.registry.commit_intent(&commitment))
            .await
            .map_err(|e| AttemptFailure::from_send("commit", e, None))?;
        let commit_tx = Some(commit.hash);
        match commit.status {
            ConfirmationStatus::Confirmed { block_number } => {
                tracing::info!(name = %name, tx_hash = %commit.hash, block_number, "Commitment confirmed");
            }
            ConfirmationStatus::Pending => {
                tracing::warn!(name = %name, tx_hash = %commit.hash, "Commit receipt timed out, continuing");
            }
            ConfirmationStatus::Reverted { .. } => {
                return Err(AttemptFailure::retry("commit reverted", commit_tx));
            }
        }

        // Maturing
        enter(attempt, MintPhase::Maturing);
        if !self.wait_for_maturity(&name).await {
            return Err(AttemptFailure::fatal(
                "interrupted while commitment was maturing",
                commit_tx,
            ));
        }

        // Rechecking
        enter(attempt, MintPhase::Rechecking);
        if !self.registry.is_available(&name).await {
            return Err(AttemptFailure::retry(
                format!("{name} taken during maturation"),
                commit_tx,
            ));
        }

        // Registering
        enter(attempt, MintPhase::Registering);
        let register = self
            .submitter
            .submit(self.registry.register_intent(&commitment, owner))
            .await
            .map_err(|e| AttemptFailure::from_send("register", e, commit_tx))?;

        // Confirming
        enter(attempt, MintPhase::Confirming);
        let explorer_url = format!("{}{}", self.explorer_base_url, register.hash);
        match register.status {
            ConfirmationStatus::Confirmed { .. } => Ok(MintOutcome::Success {
                name,
                commit_tx: commit.hash,
                register_tx: register.hash,
                explorer_url,
            }),
            ConfirmationStatus::Pending => Ok(MintOutcome::Pending {
                name,
                commit_tx: commit.hash,
                register_tx: register.hash,
                explorer_url,
            }),
            ConfirmationStatus::Reverted { .. } => {
                Err(AttemptFailure::retry("register reverted", commit_tx))
            }
        }
    }

    /// Check a batch of random names and pick one of the available ones.
    async fn select_name(&self) -> Result<String, AttemptFailure> {
        let mut available = Vec::new();
        for name in names::candidates(&self.config, self.config.candidates_per_attempt) {
            if self.registry.is_available(&name).await {
                tracing::debug!(name = %name, "Name available");
                available.push(name);
            } else {
                tracing::debug!(name = %name, "Name taken");
            }
        }

        if available.is_empty() {
            return Err(AttemptFailure::retry("no available name among candidates", None));
        }
        let name = available.swap_remove(fastrand::usize(..available.len()));
        tracing::info!(name = %name, "Selected name");
        Ok(name)
    }

    /// Wait out the commitment age. Returns `false` on shutdown.
    async fn wait_for_maturity(&self, name: &str) -> bool {
        let wait = self.registry.maturation_wait();
        let deadline = Instant::now() + wait;
        let mut signal = self.shutdown.clone();
        tracing::info!(name, wait_secs = wait.as_secs(), "Waiting for commitment to mature");

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            if !signal.sleep(remaining.min(PROGRESS_INTERVAL)).await {
                tracing::warn!(name, "Maturation wait interrupted");
                return false;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if !left.is_zero() {
                tracing::info!(name, remaining_secs = left.as_secs(), "Commitment maturing");
            }
        }
    }

    fn finish(&self, outcome: MintOutcome) -> MintOutcome {
        metrics::record_mint(outcome.label());
        match &outcome {
            MintOutcome::Success { name, explorer_url, .. } => {
                tracing::info!(name = %name, explorer_url = %explorer_url, "Name registered");
            }
            MintOutcome::Pending { name, register_tx, .. } => {
                tracing::warn!(name = %name, tx_hash = %register_tx, "Registration pending");
            }
            MintOutcome::Failed { reason, commit_tx } => {
                tracing::error!(reason = %reason, commit_tx = ?commit_tx, "Mint failed");
            }
        }
        outcome
    }
}

fn enter(attempt: u32, phase: MintPhase) {
    tracing::debug!(attempt, phase = %phase, "Mint phase");
}
