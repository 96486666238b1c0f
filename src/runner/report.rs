//! Run summary and JSON report.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::registry::MintOutcome;
use crate::runner::RunnerError;

/// What happened for one operation on one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationResult {
    Mint(MintOutcome),
    Transaction {
        label: String,
        tx_hash: TxHash,
        /// `confirmed`, `reverted` or `pending`.
        status: String,
        explorer_url: String,
    },
    Status {
        native_balance: String,
        wrapped_balance: Option<String>,
        next_nonce: Option<u64>,
    },
    Skipped {
        reason: String,
    },
    Error {
        message: String,
    },
}

impl OperationResult {
    /// Bucket used by the summary counters; `None` for status reads.
    pub fn tally(&self) -> Option<Tally> {
        match self {
            OperationResult::Mint(MintOutcome::Success { .. }) => Some(Tally::Success),
            OperationResult::Mint(MintOutcome::Pending { .. }) => Some(Tally::Pending),
            OperationResult::Mint(MintOutcome::Failed { .. }) => Some(Tally::Failed),
            OperationResult::Transaction { status, .. } => Some(match status.as_str() {
                "confirmed" => Tally::Success,
                "pending" => Tally::Pending,
                _ => Tally::Failed,
            }),
            OperationResult::Status { .. } => None,
            OperationResult::Skipped { .. } | OperationResult::Error { .. } => Some(Tally::Failed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    /// `n` of the `PRIVATE_KEY_n` variable.
    pub index: usize,
    pub address: Option<Address>,
    pub results: Vec<OperationResult>,
}

/// Counters and per-account results for a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub operation: String,
    pub started_at_unix: u64,
    pub finished_at_unix: u64,
    pub success: usize,
    pub pending: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub accounts: Vec<AccountReport>,
}

impl RunSummary {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            started_at_unix: unix_now(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, report: AccountReport) {
        for result in &report.results {
            match result.tally() {
                Some(Tally::Success) => self.success += 1,
                Some(Tally::Pending) => self.pending += 1,
                Some(Tally::Failed) => self.failed += 1,
                None => {}
            }
        }
        self.accounts.push(report);
    }

    pub fn finish(&mut self, interrupted: bool) {
        self.interrupted = interrupted;
        self.finished_at_unix = unix_now();
    }

    /// Log the counters.
    pub fn log(&self) {
        tracing::info!(
            operation = %self.operation,
            accounts = self.accounts.len(),
            success = self.success,
            pending = self.pending,
            failed = self.failed,
            interrupted = self.interrupted,
            "Run summary"
        );
    }

    pub fn write_json(&self, path: &Path) -> Result<(), RunnerError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Report written");
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
