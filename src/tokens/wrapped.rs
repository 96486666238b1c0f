//! WETH9-style wrapped native token.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::Arc;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::TxIntent;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::{RetryConfig, TokenConfig};
use crate::resilience::RetryPolicy;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IWrappedNative {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
        function balanceOf(address owner) external view returns (uint256);
    }
}

const WRAP_GAS: (f64, u64) = (1.2, 100_000);

pub struct WrappedToken<C: ChainRpc> {
    rpc: Arc<C>,
    address: Address,
    config: TokenConfig,
    read_policy: RetryPolicy,
}

impl<C: ChainRpc> WrappedToken<C> {
    pub fn new(rpc: Arc<C>, config: TokenConfig, retry: &RetryConfig) -> BlockchainResult<Self> {
        let address = config
            .wrapped_address
            .parse::<Address>()
            .map_err(|e| BlockchainError::Contract(format!("Invalid wrapped token address: {e}")))?;
        Ok(Self {
            rpc,
            address,
            config,
            read_policy: RetryPolicy::from_config(retry),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Wrapped balance of `owner` in wei.
    pub async fn balance_of(&self, owner: Address) -> BlockchainResult<U256> {
        let request = TransactionRequest::default()
            .with_to(self.address)
            .with_input(IWrappedNative::balanceOfCall { owner }.abi_encode());
        let rpc = &self.rpc;

        let output = self
            .read_policy
            .run("wrapped_balance", || {
                let request = request.clone();
                async move { rpc.call(request).await }
            })
            .await?;

        IWrappedNative::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Contract(format!("balanceOf: undecodable return data: {e}")))
    }

    /// `deposit()` carrying `amount` of native token.
    pub fn wrap_intent(&self, amount: U256) -> TxIntent {
        TxIntent::new("wrap", self.address, IWrappedNative::depositCall {}.abi_encode())
            .with_value(amount)
            .with_gas(WRAP_GAS.0, WRAP_GAS.1)
            .with_timeout(self.config.timeout_secs)
    }

    /// `withdraw(amount)`.
    pub fn unwrap_intent(&self, amount: U256) -> TxIntent {
        TxIntent::new(
            "unwrap",
            self.address,
            IWrappedNative::withdrawCall { wad: amount }.abi_encode(),
        )
        .with_gas(WRAP_GAS.0, WRAP_GAS.1)
        .with_timeout(self.config.timeout_secs)
    }
}
