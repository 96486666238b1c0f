//! The RPC surface the rest of the crate depends on.
//!
//! `BlockchainClient` implements it over alloy HTTP providers; tests implement
//! it over an in-memory chain.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use std::future::Future;

use crate::blockchain::types::{BlockchainResult, ReceiptInfo};

/// Chain access needed by the gas oracle, submitter and orchestrator.
pub trait ChainRpc: Send + Sync {
    /// Chain ID reported by the node.
    fn chain_id(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Latest block number.
    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Native balance in wei.
    fn balance(&self, address: Address) -> impl Future<Output = BlockchainResult<U256>> + Send;

    /// Transaction count including the pending pool.
    fn pending_nonce(&self, address: Address) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// One gas price sample per reachable endpoint.
    fn gas_price_samples(&self) -> impl Future<Output = Vec<u128>> + Send;

    /// `eth_estimateGas` for the request.
    fn estimate_gas(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// `eth_call` against the latest block.
    fn call(&self, tx: TransactionRequest) -> impl Future<Output = BlockchainResult<Bytes>> + Send;

    /// Broadcast a signed, EIP-2718 encoded transaction.
    ///
    /// Node rejections are returned as `BlockchainError::Rpc` with the node's
    /// message intact so callers can classify them.
    fn send_raw(&self, raw: Bytes) -> impl Future<Output = BlockchainResult<TxHash>> + Send;

    /// Receipt for a transaction, `None` while it is pending.
    fn receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = BlockchainResult<Option<ReceiptInfo>>> + Send;
}
