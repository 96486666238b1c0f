//! Shared utilities for integration tests: an in-memory chain that decodes
//! signed transactions and executes the registry and wrapped-token calls.

#![allow(dead_code)]

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolInterface, SolValue};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use name_minter::blockchain::rpc::ChainRpc;
use name_minter::blockchain::types::{BlockchainError, BlockchainResult, ReceiptInfo};
use name_minter::blockchain::wallet::Wallet;
use name_minter::config::schema::MinterConfig;
use name_minter::registry::commitment::{commitment_hash, name_hash};
use name_minter::registry::contract::INameRegistry::INameRegistryCalls;
use name_minter::tokens::wrapped::IWrappedNative::IWrappedNativeCalls;

/// Anvil's first account.
pub const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const CHAIN_ID: u64 = 688688;

pub fn one_ether() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

/// A transaction the chain saw, accepted or not.
#[derive(Debug, Clone)]
pub struct SeenTx {
    pub hash: TxHash,
    pub nonce: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub accepted: bool,
    pub at: Instant,
}

#[derive(Debug)]
pub struct ChainState {
    pub chain_id: u64,
    pub block: u64,
    pub from: Address,
    pub registry: Address,
    pub wrapped_token: Address,
    pub balance: U256,
    pub nonce: u64,
    /// Transactions do not consume the nonce (dropped from the pool).
    pub hold_nonce: bool,
    pub gas_prices: Vec<u128>,
    pub estimate_fails: bool,
    pub fee: U256,
    pub min_age_secs: u64,
    pub reads_fail: bool,
    pub all_taken: bool,
    pub taken: HashSet<String>,
    pub commitments: HashMap<B256, Instant>,
    /// Commits after which the next availability check answers "taken".
    pub steal_after_commits: u32,
    deny_available: u32,
    pub register_reverts: u32,
    pub wrapped: U256,
    /// Rejections returned by the next broadcasts, in order.
    pub send_errors: VecDeque<String>,
    pub withhold_receipts: bool,
    /// Receipts of registry `commit` transactions never show up.
    pub withhold_commit_receipts: bool,
    pub seen: Vec<SeenTx>,
    pub receipts: HashMap<TxHash, ReceiptInfo>,
}

/// In-memory chain implementing the RPC seam.
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn new(config: &MinterConfig, from: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                chain_id: CHAIN_ID,
                block: 100,
                from,
                registry: config.registry.contract_address.parse().unwrap(),
                wrapped_token: config.token.wrapped_address.parse().unwrap(),
                balance: one_ether(),
                nonce: 0,
                hold_nonce: false,
                gas_prices: vec![1_000_000_000, 1_200_000_000],
                estimate_fails: false,
                fee: U256::from(config.registry.default_minting_fee_wei),
                min_age_secs: 60,
                reads_fail: false,
                all_taken: false,
                taken: HashSet::new(),
                commitments: HashMap::new(),
                steal_after_commits: 0,
                deny_available: 0,
                register_reverts: 0,
                wrapped: U256::ZERO,
                send_errors: VecDeque::new(),
                withhold_receipts: false,
                withhold_commit_receipts: false,
                seen: Vec::new(),
                receipts: HashMap::new(),
            })),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn accepted(&self) -> Vec<SeenTx> {
        self.with(|s| s.seen.iter().filter(|t| t.accepted).cloned().collect())
    }

    pub fn accepted_calls(&self) -> Vec<INameRegistryCalls> {
        self.accepted()
            .iter()
            .filter_map(|t| INameRegistryCalls::abi_decode(&t.input).ok())
            .collect()
    }
}

/// Test configuration with short delays and no waiting between accounts.
pub fn test_config() -> MinterConfig {
    let mut config = MinterConfig::default();
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config.registry.attempt_delay_ms = 10;
    config.runner.account_delay_secs = 0;
    config
}

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_KEY).unwrap()
}

fn reverted(what: &str) -> BlockchainError {
    BlockchainError::Reverted(format!("execution reverted: {what}"))
}

impl ChainState {
    fn is_available(&mut self, name: &str) -> bool {
        if self.deny_available > 0 {
            self.deny_available -= 1;
            return false;
        }
        !self.all_taken && !self.taken.contains(name)
    }

    /// Execute an accepted transaction and return whether it succeeded.
    fn execute(&mut self, to: Option<Address>, value: U256, input: &[u8]) -> bool {
        if value > self.balance {
            return false;
        }
        self.balance -= value;

        if to == Some(self.registry) {
            match INameRegistryCalls::abi_decode(input) {
                Ok(INameRegistryCalls::commit(call)) => {
                    self.commitments.insert(call.commitment, Instant::now());
                    if self.steal_after_commits > 0 {
                        self.steal_after_commits -= 1;
                        self.deny_available += 1;
                    }
                    true
                }
                Ok(INameRegistryCalls::register(call)) => {
                    if self.register_reverts > 0 {
                        self.register_reverts -= 1;
                        return false;
                    }
                    let key = commitment_hash(name_hash(&call.name), call.secret);
                    let matured = self
                        .commitments
                        .get(&key)
                        .is_some_and(|at| at.elapsed().as_secs() >= self.min_age_secs);
                    let ok = matured
                        && call.owner == self.from
                        && value >= self.fee
                        && !self.taken.contains(&call.name);
                    if ok {
                        self.taken.insert(call.name);
                        self.commitments.remove(&key);
                    }
                    ok
                }
                _ => false,
            }
        } else if to == Some(self.wrapped_token) {
            match IWrappedNativeCalls::abi_decode(input) {
                Ok(IWrappedNativeCalls::deposit(_)) => {
                    self.wrapped += value;
                    true
                }
                Ok(IWrappedNativeCalls::withdraw(call)) if call.wad <= self.wrapped => {
                    self.wrapped -= call.wad;
                    self.balance += call.wad;
                    true
                }
                _ => false,
            }
        } else {
            true
        }
    }
}

impl ChainRpc for MockChain {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(self.with(|s| s.chain_id))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        Ok(self.with(|s| s.block))
    }

    async fn balance(&self, _address: Address) -> BlockchainResult<U256> {
        Ok(self.with(|s| s.balance))
    }

    async fn pending_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.with(|s| s.nonce))
    }

    async fn gas_price_samples(&self) -> Vec<u128> {
        self.with(|s| s.gas_prices.clone())
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> BlockchainResult<u64> {
        if self.with(|s| s.estimate_fails) {
            return Err(BlockchainError::Rpc("estimate unavailable".to_string()));
        }
        Ok(100_000)
    }

    async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        let input = tx.input.input().cloned().unwrap_or_default();
        let to = tx.to.and_then(|kind| kind.to().copied());

        self.with(|s| {
            if s.reads_fail {
                return Err(BlockchainError::Rpc("connection refused".to_string()));
            }
            if to == Some(s.registry) {
                return match INameRegistryCalls::abi_decode(&input) {
                    Ok(INameRegistryCalls::available(call)) => Ok(s.is_available(&call.name).abi_encode().into()),
                    Ok(INameRegistryCalls::mintingFee(_)) => Ok(s.fee.abi_encode().into()),
                    Ok(INameRegistryCalls::minCommitmentAge(_)) => {
                        Ok(U256::from(s.min_age_secs).abi_encode().into())
                    }
                    _ => Err(reverted("unknown registry call")),
                };
            }
            if to == Some(s.wrapped_token) {
                return match IWrappedNativeCalls::abi_decode(&input) {
                    Ok(IWrappedNativeCalls::balanceOf(_)) => Ok(s.wrapped.abi_encode().into()),
                    _ => Err(reverted("unknown token call")),
                };
            }
            Err(reverted("no code"))
        })
    }

    async fn send_raw(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| BlockchainError::Rpc(format!("invalid transaction: {e}")))?;
        assert_eq!(envelope.chain_id(), Some(CHAIN_ID));

        self.with(|s| {
            let mut seen = SeenTx {
                hash: *envelope.tx_hash(),
                nonce: envelope.nonce(),
                to: envelope.to(),
                value: envelope.value(),
                input: envelope.input().clone(),
                gas_limit: envelope.gas_limit(),
                gas_price: envelope.gas_price().unwrap_or(envelope.max_fee_per_gas()),
                accepted: false,
                at: Instant::now(),
            };

            if let Some(error) = s.send_errors.pop_front() {
                s.seen.push(seen);
                return Err(BlockchainError::Rpc(format!("server returned an error response: {error}")));
            }
            if seen.nonce < s.nonce {
                s.seen.push(seen);
                return Err(BlockchainError::Rpc("nonce too low".to_string()));
            }

            if !s.hold_nonce {
                s.nonce = seen.nonce + 1;
            }
            seen.accepted = true;
            let success = s.execute(seen.to, seen.value, &seen.input);
            s.block += 1;
            s.receipts.insert(
                seen.hash,
                ReceiptInfo {
                    tx_hash: seen.hash,
                    block_number: Some(s.block),
                    success,
                    gas_used: 21_000,
                },
            );
            let hash = seen.hash;
            s.seen.push(seen);
            Ok(hash)
        })
    }

    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>> {
        Ok(self.with(|s| {
            let is_commit = s.seen.iter().any(|t| {
                t.hash == tx_hash
                    && matches!(
                        INameRegistryCalls::abi_decode(&t.input),
                        Ok(INameRegistryCalls::commit(_))
                    )
            });
            if s.withhold_receipts || (s.withhold_commit_receipts && is_commit) {
                None
            } else {
                s.receipts.get(&tx_hash).cloned()
            }
        }))
    }
}
