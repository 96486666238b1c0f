//! Name-service registry contract binding.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::transaction::TxIntent;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::{RegistryConfig, RetryConfig};
use crate::registry::commitment::Commitment;
use crate::resilience::RetryPolicy;

sol! {
    /// Commit-reveal name registry.
    #[derive(Debug, PartialEq, Eq)]
    interface INameRegistry {
        function commit(bytes32 commitment) external;
        function register(string name, address owner, bytes32 secret) external payable;
        function available(string name) external view returns (bool);
        function minCommitmentAge() external view returns (uint256);
        function mintingFee() external view returns (uint256);
    }
}

/// Gas buffer and fallback limit for `commit`.
const COMMIT_GAS: (f64, u64) = (1.3, 150_000);
/// Gas buffer and fallback limit for `register`.
const REGISTER_GAS: (f64, u64) = (1.5, 350_000);
/// Reads that revert this often are not retried further.
const READ_REVERT_LIMIT: u32 = 2;

/// Read access and call encoding for the registry.
pub struct RegistryClient<C: ChainRpc> {
    rpc: Arc<C>,
    address: Address,
    config: RegistryConfig,
    read_policy: RetryPolicy,
    minting_fee: U256,
    min_commitment_age: Duration,
}

impl<C: ChainRpc> RegistryClient<C> {
    pub fn new(rpc: Arc<C>, config: RegistryConfig, retry: &RetryConfig) -> BlockchainResult<Self> {
        let address = config
            .contract_address
            .parse::<Address>()
            .map_err(|e| BlockchainError::Contract(format!("Invalid registry address: {e}")))?;
        Ok(Self {
            rpc,
            address,
            minting_fee: U256::from(config.default_minting_fee_wei),
            min_commitment_age: Duration::from_secs(config.default_min_commitment_age_secs),
            read_policy: RetryPolicy::from_config(retry).abort_after_reverts(READ_REVERT_LIMIT),
            config,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Cached minting fee in wei.
    pub fn minting_fee(&self) -> U256 {
        self.minting_fee
    }

    /// Cached `minCommitmentAge()`.
    pub fn min_commitment_age(&self) -> Duration {
        self.min_commitment_age
    }

    /// Read fee and commitment age once; failures keep the defaults.
    pub async fn preload(&mut self) {
        match self.read(INameRegistry::mintingFeeCall {}, "minting_fee").await {
            Ok(fee) if fee.is_zero() => {
                tracing::warn!(fee = %self.minting_fee, "Contract reported zero minting fee, keeping cached value");
            }
            Ok(fee) => {
                tracing::info!(fee = %fee, "Minting fee loaded");
                self.minting_fee = fee;
            }
            Err(e) => {
                tracing::warn!(error = %e, fee = %self.minting_fee, "Could not read minting fee, using default");
            }
        }

        match self
            .read(INameRegistry::minCommitmentAgeCall {}, "min_commitment_age")
            .await
        {
            Ok(age) => {
                let secs = u64::try_from(age).unwrap_or(u64::MAX);
                tracing::info!(secs, "Minimum commitment age loaded");
                self.min_commitment_age = Duration::from_secs(secs);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    secs = self.min_commitment_age.as_secs(),
                    "Could not read minimum commitment age, using default"
                );
            }
        }
    }

    /// Whether `name` can be registered. Unknown counts as taken.
    pub async fn is_available(&self, name: &str) -> bool {
        let call = INameRegistry::availableCall {
            name: name.to_string(),
        };
        match self.read(call, "available").await {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(name, error = %e, "Availability check failed, treating as taken");
                false
            }
        }
    }

    /// Time to wait after a commit before registering.
    pub fn maturation_wait(&self) -> Duration {
        let floor = Duration::from_secs(self.config.min_commitment_floor_secs);
        self.min_commitment_age.max(floor)
            + Duration::from_secs(self.config.commitment_safety_margin_secs)
    }

    pub fn commit_intent(&self, commitment: &Commitment) -> TxIntent {
        let data = INameRegistry::commitCall {
            commitment: commitment.commitment,
        }
        .abi_encode();
        TxIntent::new("commit", self.address, data)
            .with_gas(COMMIT_GAS.0, COMMIT_GAS.1)
            .with_timeout(self.config.commit_timeout_secs)
    }

    pub fn register_intent(&self, commitment: &Commitment, owner: Address) -> TxIntent {
        let data = INameRegistry::registerCall {
            name: commitment.name.clone(),
            owner,
            secret: commitment.secret,
        }
        .abi_encode();
        TxIntent::new("register", self.address, data)
            .with_value(self.minting_fee)
            .with_gas(REGISTER_GAS.0, REGISTER_GAS.1)
            .with_timeout(self.config.register_timeout_secs)
    }

    async fn read<T: SolCall>(&self, call: T, label: &str) -> BlockchainResult<T::Return> {
        let request = TransactionRequest::default()
            .with_to(self.address)
            .with_input(Bytes::from(call.abi_encode()));
        let rpc = &self.rpc;

        let output = self
            .read_policy
            .run(label, || {
                let request = request.clone();
                async move { rpc.call(request).await }
            })
            .await?;

        T::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Contract(format!("{label}: undecodable return data: {e}")))
    }
}

