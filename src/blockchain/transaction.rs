//! Transaction building, signing, broadcast and confirmation monitoring.
//!
//! # Responsibilities
//! - Estimate gas limits with a per-intent buffer and fallback
//! - Reserve nonces and price transactions through the gas oracle
//! - Classify broadcast rejections and react (resync, bump, stop)
//! - Poll receipts until confirmed, reverted, or the deadline passes

use alloy::network::TransactionBuilder;
use alloy::primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, timeout};

use crate::blockchain::gas::{apply_fees, GasOracle};
use crate::blockchain::nonce::NonceTracker;
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus, SendFailure};
use crate::blockchain::wallet::Wallet;
use crate::config::schema::{MinterConfig, RetryConfig, SubmitterConfig};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::RetryPolicy;

/// Attempts for `eth_estimateGas` before the default limit is used.
const ESTIMATE_ATTEMPTS: u32 = 3;

/// A contract call or transfer to be sent from the session's account.
#[derive(Debug, Clone)]
pub struct TxIntent {
    /// Short name used in logs, metrics and the duplicate guard.
    pub label: &'static str,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    /// Multiplier applied to the node's gas estimate.
    pub gas_buffer: f64,
    /// Gas limit used when estimation keeps failing.
    pub default_gas_limit: u64,
    /// Receipt deadline in seconds.
    pub timeout_secs: u64,
}

impl TxIntent {
    pub fn new(label: &'static str, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            label,
            to,
            value: U256::ZERO,
            data: data.into(),
            gas_buffer: 1.2,
            default_gas_limit: 100_000,
            timeout_secs: 300,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, buffer: f64, default_limit: u64) -> Self {
        self.gas_buffer = buffer;
        self.default_gas_limit = default_limit;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// A transaction accepted by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Broadcast {
    pub hash: TxHash,
    pub nonce: u64,
}

/// A broadcast transaction together with what the receipt poller saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: TxHash,
    pub nonce: u64,
    pub status: ConfirmationStatus,
}

type SentKey = (&'static str, u64, Address);

/// What went out under a `SentKey`.
#[derive(Debug, Clone, Copy)]
struct SentTx {
    /// Digest of value and calldata; a different payload on the same nonce is
    /// a new transaction, not a duplicate.
    payload: B256,
    hash: TxHash,
}

fn payload_digest(intent: &TxIntent) -> B256 {
    let mut buf = Vec::with_capacity(32 + intent.data.len());
    buf.extend_from_slice(&intent.value.to_be_bytes::<32>());
    buf.extend_from_slice(&intent.data);
    keccak256(buf)
}

/// Sends transactions for one account.
pub struct TxSubmitter<C: ChainRpc> {
    rpc: Arc<C>,
    wallet: Wallet,
    nonces: NonceTracker,
    gas: GasOracle,
    /// Transactions already broadcast, keyed by `(label, nonce, to)`.
    sent: DashMap<SentKey, SentTx>,
    estimate_policy: RetryPolicy,
    retry: RetryConfig,
    config: SubmitterConfig,
    chain_id: u64,
    confirmation_blocks: u32,
}

impl<C: ChainRpc> TxSubmitter<C> {
    /// Create a submitter signing for `chain_id`.
    pub fn new(rpc: Arc<C>, wallet: Wallet, config: &MinterConfig, chain_id: u64) -> Self {
        Self {
            rpc,
            wallet,
            nonces: NonceTracker::new(),
            gas: GasOracle::new(config.gas.clone()),
            sent: DashMap::new(),
            estimate_policy: RetryPolicy::from_config(&config.retries).with_attempts(ESTIMATE_ATTEMPTS),
            retry: config.retries.clone(),
            config: config.submitter.clone(),
            chain_id,
            confirmation_blocks: config.network.confirmation_blocks.max(1),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn rpc(&self) -> &Arc<C> {
        &self.rpc
    }

    /// Broadcast `intent` and wait for its receipt.
    pub async fn submit(&self, intent: TxIntent) -> BlockchainResult<SubmittedTx> {
        let broadcast = match self.send(&intent).await {
            Ok(broadcast) => broadcast,
            Err(e) => {
                metrics::record_tx(intent.label, "unsent");
                return Err(e);
            }
        };

        let status = self
            .wait_for_confirmation(broadcast.hash, intent.timeout_secs)
            .await;
        let outcome = match &status {
            ConfirmationStatus::Confirmed { block_number } => {
                tracing::info!(label = intent.label, tx_hash = %broadcast.hash, block_number, "Transaction confirmed");
                "confirmed"
            }
            ConfirmationStatus::Reverted { block_number } => {
                tracing::warn!(label = intent.label, tx_hash = %broadcast.hash, block_number, "Transaction reverted");
                "reverted"
            }
            ConfirmationStatus::Pending => {
                tracing::warn!(
                    label = intent.label,
                    tx_hash = %broadcast.hash,
                    timeout_secs = intent.timeout_secs,
                    "No receipt before deadline, transaction may still be mined"
                );
                "pending"
            }
        };
        metrics::record_tx(intent.label, outcome);

        Ok(SubmittedTx {
            hash: broadcast.hash,
            nonce: broadcast.nonce,
            status,
        })
    }

    /// Sign and broadcast `intent` without waiting for a receipt.
    pub async fn send(&self, intent: &TxIntent) -> BlockchainResult<Broadcast> {
        let address = self.address();
        let gas_limit = self.gas_limit(intent).await;

        let mut nonce = self.nonces.reserve(self.chain_nonce(address).await);
        let payload = payload_digest(intent);
        let mut key = (intent.label, nonce, intent.to);
        if let Some(previous) = self.sent.get(&key).map(|entry| *entry) {
            if previous.payload == payload {
                tracing::info!(label = intent.label, nonce, tx_hash = %previous.hash, "Transaction already sent, reusing hash");
                return Ok(Broadcast {
                    hash: previous.hash,
                    nonce,
                });
            }
            tracing::warn!(
                label = intent.label,
                nonce,
                replaced = %previous.hash,
                "Nonce reused for a different payload, sending replacement"
            );
        }

        let base_price = match self.gas.quote(self.rpc.as_ref()).await {
            Ok(price) => price,
            Err(e) => {
                self.nonces.release(nonce);
                return Err(e);
            }
        };

        let max_attempts = self.config.max_send_attempts.max(1);
        let mut bumps = 0u32;
        let mut last_error = BlockchainError::Rpc("transaction was not sent".to_string());

        for attempt in 1..=max_attempts {
            let gas_price = match self.gas.bump(base_price, bumps) {
                Ok(price) => price,
                Err(e) => {
                    tracing::error!(label = intent.label, bumps, error = %e, "Bumped gas price over ceiling");
                    self.nonces.release(nonce);
                    return Err(e);
                }
            };
            let request = apply_fees(
                TransactionRequest::default()
                    .with_to(intent.to)
                    .with_value(intent.value)
                    .with_input(intent.data.clone())
                    .with_nonce(nonce)
                    .with_gas_limit(gas_limit)
                    .with_chain_id(self.chain_id),
                gas_price,
                self.gas.fee_mode(),
            );

            let signed = match self.wallet.sign(request).await {
                Ok(signed) => signed,
                Err(e) => {
                    self.nonces.release(nonce);
                    return Err(e);
                }
            };

            let error = match self.rpc.send_raw(signed.raw.clone()).await {
                Ok(hash) => {
                    self.sent.insert(key, SentTx { payload, hash });
                    tracing::info!(label = intent.label, tx_hash = %hash, nonce, gas_limit, attempt, "Transaction sent");
                    return Ok(Broadcast { hash, nonce });
                }
                Err(e) => e,
            };

            let message = error.to_string();
            match SendFailure::classify(&message) {
                SendFailure::AlreadyKnown => {
                    self.sent.insert(
                        key,
                        SentTx {
                            payload,
                            hash: signed.hash,
                        },
                    );
                    tracing::info!(label = intent.label, tx_hash = %signed.hash, nonce, "Transaction already known to node");
                    return Ok(Broadcast {
                        hash: signed.hash,
                        nonce,
                    });
                }
                SendFailure::InsufficientFunds => {
                    self.nonces.release(nonce);
                    tracing::error!(label = intent.label, %address, "Insufficient funds for transaction");
                    return Err(BlockchainError::InsufficientFunds(message));
                }
                SendFailure::NonceTooLow => {
                    tracing::warn!(label = intent.label, nonce, attempt, "Nonce too low, resyncing");
                    let chain = self.chain_nonce(address).await;
                    if let Some(chain) = chain {
                        self.nonces.resync(chain);
                    }
                    nonce = self.nonces.reserve(chain);
                    key = (intent.label, nonce, intent.to);
                    last_error = BlockchainError::Nonce(message);
                }
                SendFailure::Underpriced => {
                    bumps += 1;
                    tracing::warn!(label = intent.label, attempt, bumps, "Transaction underpriced, bumping gas price");
                    last_error = error;
                }
                SendFailure::Transient => {
                    tracing::warn!(label = intent.label, attempt, error = %message, "Broadcast failed");
                    last_error = error;
                    if attempt < max_attempts {
                        metrics::record_retry(intent.label);
                        sleep(calculate_backoff(attempt, &self.retry)).await;
                    }
                }
            }
        }

        self.nonces.release(nonce);
        tracing::error!(label = intent.label, attempts = max_attempts, error = %last_error, "Giving up on transaction");
        Err(last_error)
    }

    /// Reset local nonce state from the chain's pending count.
    ///
    /// Used after a receipt timeout, when the node may have dropped the
    /// transaction.
    pub async fn resync_nonce(&self) -> BlockchainResult<u64> {
        let chain = self.rpc.pending_nonce(self.address()).await?;
        self.nonces.resync(chain);
        Ok(chain)
    }

    /// Poll for the receipt until it is buried deep enough or `timeout_secs`
    /// elapses.
    ///
    /// Lookup errors are logged and polling continues.
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash, timeout_secs: u64) -> ConfirmationStatus {
        let required = self.confirmation_blocks as u64;
        let poll_interval = Duration::from_millis(self.config.receipt_poll_interval_ms.max(1));

        let result = timeout(Duration::from_secs(timeout_secs), async {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                let receipt = match self.rpc.receipt(tx_hash).await {
                    Ok(Some(receipt)) => receipt,
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                        continue;
                    }
                };
                let Some(tx_block) = receipt.block_number else {
                    continue;
                };

                if !receipt.success {
                    return ConfirmationStatus::Reverted {
                        block_number: tx_block,
                    };
                }
                if required <= 1 {
                    return ConfirmationStatus::Confirmed {
                        block_number: tx_block,
                    };
                }

                let Ok(current_block) = self.rpc.block_number().await else {
                    continue;
                };
                let confirmations = current_block.saturating_sub(tx_block) + 1;
                if confirmations >= required {
                    return ConfirmationStatus::Confirmed {
                        block_number: tx_block,
                    };
                }

                tracing::debug!(
                    tx_hash = %tx_hash,
                    confirmations,
                    required,
                    "Waiting for confirmations"
                );
            }
        })
        .await;

        result.unwrap_or(ConfirmationStatus::Pending)
    }

    async fn chain_nonce(&self, address: Address) -> Option<u64> {
        match self.rpc.pending_nonce(address).await {
            Ok(nonce) => Some(nonce),
            Err(e) => {
                tracing::warn!(%address, error = %e, "Pending nonce query failed");
                None
            }
        }
    }

    async fn gas_limit(&self, intent: &TxIntent) -> u64 {
        let request = TransactionRequest::default()
            .with_from(self.address())
            .with_to(intent.to)
            .with_value(intent.value)
            .with_input(intent.data.clone());
        let rpc = &self.rpc;

        let estimate = self
            .estimate_policy
            .run(intent.label, || {
                let request = request.clone();
                async move { rpc.estimate_gas(request).await }
            })
            .await;

        match estimate {
            Ok(estimate) => {
                let limit = (estimate as f64 * intent.gas_buffer).ceil() as u64;
                tracing::debug!(label = intent.label, estimate, limit, "Gas estimated");
                limit
            }
            Err(e) => {
                tracing::warn!(
                    label = intent.label,
                    error = %e,
                    default = intent.default_gas_limit,
                    "Gas estimation failed, using default limit"
                );
                intent.default_gas_limit
            }
        }
    }
}
