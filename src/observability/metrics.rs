//! Metrics collection and exposition.
//!
//! # Metrics
//! - `minter_rpc_failovers_total` (counter): calls moved to the next endpoint, by operation
//! - `minter_retries_total` (counter): retried operations, by operation
//! - `minter_gas_price_gwei` (gauge): last selected gas price
//! - `minter_transactions_total` (counter): transactions by label and outcome
//! - `minter_mints_total` (counter): mint runs by outcome
//!
//! Recording is a no-op until a recorder is installed by `init_metrics`.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and serve scrapes on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_failover(op: &'static str) {
    ::metrics::counter!("minter_rpc_failovers_total", "op" => op).increment(1);
}

pub fn record_retry(op: &str) {
    ::metrics::counter!("minter_retries_total", "op" => op.to_string()).increment(1);
}

pub fn record_gas_price(gwei: f64) {
    ::metrics::gauge!("minter_gas_price_gwei").set(gwei);
}

pub fn record_tx(label: &'static str, outcome: &'static str) {
    ::metrics::counter!("minter_transactions_total", "label" => label, "outcome" => outcome)
        .increment(1);
}

pub fn record_mint(outcome: &'static str) {
    ::metrics::counter!("minter_mints_total", "outcome" => outcome).increment(1);
}
