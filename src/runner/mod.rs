//! Multi-account runner.
//!
//! # Data Flow
//! ```text
//! accounts.rs (PRIVATE_KEY_n)
//!     → per account: connect client → submitter → operation
//!     → report.rs (counters, JSON)
//! ```
//!
//! Accounts run one after another with `account_delay_secs` between them.

pub mod accounts;
pub mod report;

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::client::{BlockchainClient, SessionHeaders};
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::{TxIntent, TxSubmitter};
use crate::blockchain::types::{BlockchainError, ConfirmationStatus};
use crate::blockchain::wallet::Wallet;
use crate::config::schema::MinterConfig;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::registry::{MintOrchestrator, MintOutcome, RegistryClient};
use crate::tokens::WrappedToken;

pub use accounts::{load_accounts, AccountKey};
pub use report::{AccountReport, OperationResult, RunSummary};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no usable PRIVATE_KEY_n variables found")]
    NoAccounts,
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// What to do for each account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Mint { count: u32 },
    Wrap { amount: U256 },
    Unwrap { amount: U256 },
    Status,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Mint { .. } => "mint",
            Operation::Wrap { .. } => "wrap",
            Operation::Unwrap { .. } => "unwrap",
            Operation::Status => "status",
        }
    }
}

/// Runs an operation across all configured accounts.
pub struct Runner {
    config: MinterConfig,
    shutdown: Shutdown,
}

impl Runner {
    pub fn new(config: MinterConfig, shutdown: Shutdown) -> Self {
        Self { config, shutdown }
    }

    pub async fn run(&self, accounts: &[AccountKey], operation: &Operation) -> Result<RunSummary, RunnerError> {
        if accounts.is_empty() {
            return Err(RunnerError::NoAccounts);
        }

        let mut summary = RunSummary::new(operation.name());
        let mut signal = self.shutdown.subscribe();
        let delay = Duration::from_secs(self.config.runner.account_delay_secs);

        for (position, account) in accounts.iter().enumerate() {
            if signal.is_triggered() {
                break;
            }
            tracing::info!(
                account = account.index,
                address = %account.wallet.address(),
                progress = %format!("{}/{}", position + 1, accounts.len()),
                operation = operation.name(),
                "Processing account"
            );

            let results = match self.connect(account).await {
                Ok(client) => {
                    let chain_id = client.signing_chain_id();
                    execute(
                        Arc::new(client),
                        account.wallet.clone(),
                        chain_id,
                        &self.config,
                        operation,
                        self.shutdown.subscribe(),
                    )
                    .await
                }
                Err(e) => {
                    tracing::error!(account = account.index, error = %e, "Could not connect");
                    vec![OperationResult::Error {
                        message: e.to_string(),
                    }]
                }
            };

            summary.record(AccountReport {
                index: account.index,
                address: Some(account.wallet.address()),
                results,
            });

            if position + 1 < accounts.len() && !delay.is_zero() {
                tracing::info!(secs = delay.as_secs(), "Waiting before next account");
                if !signal.sleep(delay).await {
                    break;
                }
            }
        }

        summary.finish(signal.is_triggered());
        Ok(summary)
    }

    async fn connect(&self, account: &AccountKey) -> Result<BlockchainClient, BlockchainError> {
        let user_agent = account
            .user_agent
            .clone()
            .unwrap_or_else(|| self.config.network.user_agent.clone());
        let headers = SessionHeaders::new(user_agent);
        BlockchainClient::connect(self.config.network.clone(), &headers, &self.config.retries).await
    }
}

/// Run `operation` for one account over `rpc`.
///
/// Errors are reported in the results rather than returned so one bad
/// account does not stop the run.
pub async fn execute<C: ChainRpc>(
    rpc: Arc<C>,
    wallet: Wallet,
    chain_id: u64,
    config: &MinterConfig,
    operation: &Operation,
    shutdown: ShutdownSignal,
) -> Vec<OperationResult> {
    let address = wallet.address();
    let submitter = Arc::new(TxSubmitter::new(rpc.clone(), wallet, config, chain_id));
    let symbol = &config.token.native_symbol;

    let balance = match rpc.balance(address).await {
        Ok(balance) => {
            tracing::info!(%address, balance = %format_ether(balance), symbol = %symbol, "Native balance");
            balance
        }
        Err(e) => {
            return vec![OperationResult::Error {
                message: format!("balance query failed: {e}"),
            }]
        }
    };

    let result = match operation {
        Operation::Mint { count } => {
            return mint(rpc, submitter, balance, config, *count, shutdown).await;
        }
        Operation::Wrap { amount } => wrap_native(rpc, &submitter, balance, config, *amount).await,
        Operation::Unwrap { amount } => unwrap_native(rpc, &submitter, config, *amount).await,
        Operation::Status => status(rpc, &submitter, balance, config).await,
    };

    vec![result.unwrap_or_else(|e| OperationResult::Error {
        message: e.to_string(),
    })]
}

async fn mint<C: ChainRpc>(
    rpc: Arc<C>,
    submitter: Arc<TxSubmitter<C>>,
    mut balance: U256,
    config: &MinterConfig,
    count: u32,
    shutdown: ShutdownSignal,
) -> Vec<OperationResult> {
    let mut registry = match RegistryClient::new(rpc.clone(), config.registry.clone(), &config.retries) {
        Ok(registry) => registry,
        Err(e) => {
            return vec![OperationResult::Error {
                message: e.to_string(),
            }]
        }
    };
    registry.preload().await;
    let fee = registry.minting_fee();
    let registry = Arc::new(registry);

    let orchestrator = MintOrchestrator::new(
        submitter.clone(),
        registry,
        config.registry.clone(),
        config.network.explorer_base_url.clone(),
        shutdown.clone(),
    );

    let mut results = Vec::new();
    for n in 1..=count.max(1) {
        if shutdown.is_triggered() {
            break;
        }
        if balance < fee {
            tracing::warn!(
                balance = %format_ether(balance),
                fee = %format_ether(fee),
                "Balance below minting fee, skipping"
            );
            results.push(OperationResult::Skipped {
                reason: format!(
                    "balance {} below minting fee {}",
                    format_ether(balance),
                    format_ether(fee)
                ),
            });
            break;
        }

        tracing::info!(mint = n, count, "Minting name");
        let outcome = orchestrator.mint().await;
        if matches!(outcome, MintOutcome::Pending { .. }) {
            if let Err(e) = submitter.resync_nonce().await {
                tracing::warn!(error = %e, "Nonce resync failed");
            }
        }
        results.push(OperationResult::Mint(outcome));

        if n < count {
            balance = rpc.balance(submitter.address()).await.unwrap_or(balance);
        }
    }
    results
}

async fn wrap_native<C: ChainRpc>(
    rpc: Arc<C>,
    submitter: &TxSubmitter<C>,
    balance: U256,
    config: &MinterConfig,
    amount: U256,
) -> Result<OperationResult, BlockchainError> {
    if amount > balance {
        return Ok(OperationResult::Skipped {
            reason: format!(
                "wrap amount {} exceeds balance {}",
                format_ether(amount),
                format_ether(balance)
            ),
        });
    }
    let token = WrappedToken::new(rpc, config.token.clone(), &config.retries)?;
    transaction(submitter, token.wrap_intent(amount), config).await
}

async fn unwrap_native<C: ChainRpc>(
    rpc: Arc<C>,
    submitter: &TxSubmitter<C>,
    config: &MinterConfig,
    amount: U256,
) -> Result<OperationResult, BlockchainError> {
    let token = WrappedToken::new(rpc, config.token.clone(), &config.retries)?;
    let wrapped = token.balance_of(submitter.address()).await?;
    if amount > wrapped {
        return Ok(OperationResult::Skipped {
            reason: format!(
                "unwrap amount {} exceeds wrapped balance {}",
                format_ether(amount),
                format_ether(wrapped)
            ),
        });
    }
    transaction(submitter, token.unwrap_intent(amount), config).await
}

async fn status<C: ChainRpc>(
    rpc: Arc<C>,
    submitter: &TxSubmitter<C>,
    balance: U256,
    config: &MinterConfig,
) -> Result<OperationResult, BlockchainError> {
    let address = submitter.address();
    let token = WrappedToken::new(rpc.clone(), config.token.clone(), &config.retries)?;
    let wrapped = match token.balance_of(address).await {
        Ok(wrapped) => Some(format_ether(wrapped)),
        Err(e) => {
            tracing::warn!(%address, error = %e, "Wrapped balance unavailable");
            None
        }
    };
    let next_nonce = rpc.pending_nonce(address).await.ok();

    Ok(OperationResult::Status {
        native_balance: format_ether(balance),
        wrapped_balance: wrapped,
        next_nonce,
    })
}

async fn transaction<C: ChainRpc>(
    submitter: &TxSubmitter<C>,
    intent: TxIntent,
    config: &MinterConfig,
) -> Result<OperationResult, BlockchainError> {
    let label = intent.label;
    let submitted = submitter.submit(intent).await?;
    let status = match submitted.status {
        ConfirmationStatus::Confirmed { .. } => "confirmed",
        ConfirmationStatus::Reverted { .. } => "reverted",
        ConfirmationStatus::Pending => "pending",
    };
    Ok(OperationResult::Transaction {
        label: label.to_string(),
        tx_hash: submitted.hash,
        status: status.to_string(),
        explorer_url: format!("{}{}", config.network.explorer_base_url, submitted.hash),
    })
}
