//! Gas price consensus.
//!
//! # Sources
//! - `eth_gasPrice` from every reachable endpoint
//! - median of recent final prices
//! - optional configured reference price
//!
//! The median of the samples gets a random markup, is checked against the
//! ceiling, and is remembered for the next quote.

use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::{FeeMode, GasConfig};
use crate::observability::metrics;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Convert a (possibly fractional) gwei amount to wei.
pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei.max(0.0) * WEI_PER_GWEI as f64) as u128
}

/// Format wei as gwei for logs.
pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / WEI_PER_GWEI as f64
}

/// Median of the values; mean of the two middle values for even counts.
pub fn median(values: &[u128]) -> Option<u128> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(sorted[mid - 1] / 2 + sorted[mid] / 2 + (sorted[mid - 1] % 2 + sorted[mid] % 2) / 2)
    } else {
        Some(sorted[mid])
    }
}

/// Put the price on the request according to the fee mode.
pub fn apply_fees(tx: TransactionRequest, gas_price: u128, mode: FeeMode) -> TransactionRequest {
    match mode {
        FeeMode::Legacy => tx.with_gas_price(gas_price),
        FeeMode::Eip1559 => tx
            .with_max_fee_per_gas(gas_price.saturating_mul(3) / 2)
            .with_max_priority_fee_per_gas(gas_price / 2),
    }
}

/// Gas price oracle shared by all transactions of an account.
#[derive(Debug, Clone)]
pub struct GasOracle {
    config: GasConfig,
    history: Arc<Mutex<VecDeque<u128>>>,
}

impl GasOracle {
    pub fn new(config: GasConfig) -> Self {
        Self {
            config,
            history: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn fee_mode(&self) -> FeeMode {
        self.config.fee_mode
    }

    /// Sample every source and return the marked-up consensus price in wei.
    pub async fn quote<C: ChainRpc>(&self, rpc: &C) -> BlockchainResult<u128> {
        let samples = rpc.gas_price_samples().await;
        for sample in &samples {
            tracing::debug!(gwei = wei_to_gwei(*sample), "Node gas price sample");
        }
        self.consensus(samples)
    }

    /// Combine node samples with history and reference into a final price.
    pub fn consensus(&self, node_samples: Vec<u128>) -> BlockchainResult<u128> {
        let mut samples = node_samples;
        if let Some(historical) = median(&self.history_snapshot()) {
            tracing::debug!(gwei = wei_to_gwei(historical), "Historical median gas price");
            samples.push(historical);
        }
        if let Some(reference) = self.config.reference_gas_price_gwei {
            samples.push(gwei_to_wei(reference));
        }

        let Some(consensus) = median(&samples) else {
            let fallback = gwei_to_wei(self.config.fallback_gas_price_gwei);
            tracing::warn!(gwei = wei_to_gwei(fallback), "No gas price sources, using fallback");
            return Ok(fallback);
        };

        let markup = if self.config.markup_max > self.config.markup_min {
            rand::thread_rng().gen_range(self.config.markup_min..=self.config.markup_max)
        } else {
            self.config.markup_min
        };
        let final_price = (consensus as f64 * markup) as u128;

        self.check_ceiling(final_price)?;
        self.remember(final_price);
        metrics::record_gas_price(wei_to_gwei(final_price));
        tracing::info!(
            gwei = wei_to_gwei(final_price),
            sources = samples.len(),
            markup,
            "Gas price selected"
        );
        Ok(final_price)
    }

    /// Raise a price after `rejections` underpriced responses.
    ///
    /// A bumped price above the ceiling is refused like a quote would be.
    pub fn bump(&self, price: u128, rejections: u32) -> BlockchainResult<u128> {
        let bumped =
            (price as f64 * self.config.underpriced_bump.powi(rejections as i32)).round() as u128;
        self.check_ceiling(bumped)?;
        Ok(bumped)
    }

    /// Compare in wei so fractional gwei cannot slip under the ceiling.
    fn check_ceiling(&self, price: u128) -> BlockchainResult<()> {
        let max_gwei = self.config.max_gas_price_gwei;
        if price > (max_gwei as u128).saturating_mul(WEI_PER_GWEI) {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: u64::try_from(price.div_ceil(WEI_PER_GWEI)).unwrap_or(u64::MAX),
                max_gwei,
            });
        }
        Ok(())
    }

    fn remember(&self, price: u128) {
        let mut history = self.history.lock().unwrap_or_else(|p| p.into_inner());
        history.push_back(price);
        while history.len() > self.config.history_size {
            history.pop_front();
        }
    }

    fn history_snapshot(&self) -> Vec<u128> {
        let history = self.history.lock().unwrap_or_else(|p| p.into_inner());
        history.iter().copied().collect()
    }
}
