//! Blockchain RPC client with endpoint selection, failover and timeouts.
//!
//! # Responsibilities
//! - Select a live endpoint from the prioritized list at connect time
//! - Verify the chain ID
//! - Query chain state with per-call failover across endpoints
//! - Broadcast raw transactions without hiding node rejections

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportErrorKind, TransportResult};
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{
    BlockchainConfig, BlockchainError, BlockchainResult, ChainId, ReceiptInfo,
};
use crate::config::schema::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Probe attempts for the primary endpoint during endpoint selection.
const PRIMARY_PROBE_ATTEMPTS: u32 = 3;
/// Probe attempts for each fallback endpoint.
const FALLBACK_PROBE_ATTEMPTS: u32 = 2;

type DynProvider = Arc<dyn Provider + Send + Sync>;

#[derive(Clone)]
struct Endpoint {
    url: String,
    provider: DynProvider,
}

/// HTTP identity attached to every request of one account session.
#[derive(Debug, Clone)]
pub struct SessionHeaders {
    pub user_agent: String,
    pub request_id: Uuid,
}

impl SessionHeaders {
    /// Headers with a fresh request ID.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Live endpoint first, remaining endpoints in priority order.
    endpoints: Arc<Vec<Endpoint>>,
    /// Configuration.
    config: BlockchainConfig,
    /// Chain ID used for signing (may differ from config when adopted).
    chain_id: u64,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Connect to the first live endpoint in the configured priority order.
    pub async fn connect(
        config: BlockchainConfig,
        headers: &SessionHeaders,
        retry: &RetryConfig,
    ) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut endpoints = build_endpoints(&config, headers, timeout_duration)?;

        let mut live = None;
        for (idx, endpoint) in endpoints.iter().enumerate() {
            let attempts = if idx == 0 {
                PRIMARY_PROBE_ATTEMPTS
            } else {
                tracing::warn!(url = %endpoint.url, "Trying fallback RPC");
                FALLBACK_PROBE_ATTEMPTS
            };
            if probe(endpoint, attempts, timeout_duration, retry).await {
                live = Some(idx);
                break;
            }
        }

        let Some(live_idx) = live else {
            return Err(BlockchainError::Rpc(
                "failed to connect to any RPC endpoint".to_string(),
            ));
        };

        if live_idx > 0 {
            let selected = endpoints.remove(live_idx);
            tracing::info!(url = %selected.url, "Connected to fallback RPC");
            endpoints.insert(0, selected);
        }

        let mut client = Self {
            endpoints: Arc::new(endpoints),
            chain_id: config.chain_id,
            config,
            timeout_duration,
        };
        client.verify_chain_id().await?;

        tracing::info!(
            rpc_url = %client.endpoints[0].url,
            chain_id = client.chain_id,
            request_id = %headers.request_id,
            "Blockchain client initialized"
        );

        Ok(client)
    }

    /// Verify the connected chain ID, adopting the network's ID unless strict.
    async fn verify_chain_id(&mut self) -> BlockchainResult<()> {
        let network = match self.get_chain_id().await {
            Ok(id) => id.0,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    chain_id = self.chain_id,
                    "Could not verify chain ID, using configured value"
                );
                return Ok(());
            }
        };

        if network == self.config.chain_id {
            tracing::info!(chain_id = network, "Chain ID verified");
            return Ok(());
        }

        if self.config.strict_chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: network,
            });
        }

        tracing::warn!(
            expected = self.config.chain_id,
            actual = network,
            "Chain ID mismatch, adopting network chain ID"
        );
        self.chain_id = network;
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("get_chain_id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Endpoint URLs in the order calls will try them.
    pub fn endpoint_urls(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.url.as_str()).collect()
    }

    /// Chain ID used for signing.
    pub fn signing_chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Run a read against each endpoint in order until one answers.
    ///
    /// Reverts and insufficient funds are the same on every node, so they are
    /// returned immediately.
    async fn with_failover<T, F, Fut>(&self, op: &'static str, f: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::from("no endpoints");
        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            match timeout(self.timeout_duration, f(endpoint.provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => match BlockchainError::from_rpc_message(e.to_string()) {
                    BlockchainError::Rpc(message) => {
                        tracing::warn!(provider_idx = idx, op, error = %message, "RPC error, trying next provider");
                        last_error = message;
                    }
                    deterministic => return Err(deterministic),
                },
                Err(_) => {
                    tracing::warn!(provider_idx = idx, op, "RPC timeout, trying next provider");
                    last_error = format!("timeout after {}s", self.timeout_duration.as_secs());
                }
            }
            metrics::record_rpc_failover(op);
        }
        Err(BlockchainError::Rpc(format!(
            "all RPC providers failed: {op}: {last_error}"
        )))
    }
}

impl ChainRpc for BlockchainClient {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get_block_number", |p| async move { p.get_block_number().await })
            .await
    }

    async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("get_balance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("get_transaction_count", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price_samples(&self) -> Vec<u128> {
        let calls = self.endpoints.iter().map(|endpoint| {
            let provider = endpoint.provider.clone();
            let url = endpoint.url.clone();
            let deadline = self.timeout_duration;
            async move {
                match timeout(deadline, provider.get_gas_price()).await {
                    Ok(Ok(price)) => Some(price),
                    Ok(Err(e)) => {
                        tracing::warn!(url = %url, error = %e, "Gas price query failed");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(url = %url, "Gas price query timed out");
                        None
                    }
                }
            }
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> BlockchainResult<u64> {
        self.with_failover("estimate_gas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.with_failover("call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    async fn send_raw(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let mut last_error = String::from("no endpoints");
        for (idx, endpoint) in self.endpoints.iter().enumerate() {
            let fut = endpoint.provider.send_raw_transaction(&raw);
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                Ok(Err(e)) if is_node_rejection(&e) => {
                    // The node saw the transaction; another node would say the same.
                    return Err(BlockchainError::Rpc(e.to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = idx, error = %e, "Broadcast failed, trying next provider");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = idx, "Broadcast timeout, trying next provider");
                    last_error = format!("timeout after {}s", self.timeout_duration.as_secs());
                }
            }
            metrics::record_rpc_failover("send_raw_transaction");
        }
        Err(BlockchainError::Rpc(format!(
            "all RPC providers failed: send_raw_transaction: {last_error}"
        )))
    }

    async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ReceiptInfo>> {
        let receipt = self
            .with_failover("get_transaction_receipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| ReceiptInfo {
            tx_hash: r.transaction_hash,
            block_number: r.block_number,
            success: r.status(),
            gas_used: r.gas_used,
        }))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("endpoints", &self.endpoint_urls())
            .field("chain_id", &self.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

fn is_node_rejection(e: &RpcError<TransportErrorKind>) -> bool {
    e.as_error_resp().is_some()
}

/// Parse the prioritized endpoint list, skipping blanks and invalid URLs.
fn build_endpoints(
    config: &BlockchainConfig,
    headers: &SessionHeaders,
    timeout_duration: Duration,
) -> BlockchainResult<Vec<Endpoint>> {
    let http = http_client(headers, timeout_duration)?;
    let mut endpoints = Vec::new();

    for url_str in config.endpoint_candidates() {
        let url: url::Url = match url_str.parse() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %url_str, error = %e, "Ignoring invalid RPC URL");
                continue;
            }
        };
        let transport = Http::with_client(http.clone(), url);
        let provider = ProviderBuilder::new().connect_client(RpcClient::new(transport, false));
        endpoints.push(Endpoint {
            url: url_str.to_string(),
            provider: Arc::new(provider) as DynProvider,
        });
    }

    if endpoints.is_empty() {
        return Err(BlockchainError::Rpc(
            "no valid RPC endpoints configured".to_string(),
        ));
    }
    Ok(endpoints)
}

fn http_client(
    headers: &SessionHeaders,
    timeout_duration: Duration,
) -> BlockchainResult<reqwest::Client> {
    let mut map = HeaderMap::new();
    let agent = HeaderValue::from_str(&headers.user_agent)
        .map_err(|e| BlockchainError::Rpc(format!("Invalid user agent header: {e}")))?;
    map.insert(USER_AGENT, agent);
    let request_id = HeaderValue::from_str(&headers.request_id.to_string())
        .map_err(|e| BlockchainError::Rpc(format!("Invalid request id header: {e}")))?;
    map.insert(HeaderName::from_static("x-request-id"), request_id);

    reqwest::Client::builder()
        .default_headers(map)
        .timeout(timeout_duration)
        .build()
        .map_err(|e| BlockchainError::Rpc(format!("Failed to build HTTP client: {e}")))
}

/// Probe an endpoint with `eth_chainId`, backing off between attempts.
async fn probe(endpoint: &Endpoint, attempts: u32, deadline: Duration, retry: &RetryConfig) -> bool {
    for attempt in 1..=attempts {
        match timeout(deadline, endpoint.provider.get_chain_id()).await {
            Ok(Ok(_)) => return true,
            Ok(Err(e)) => {
                tracing::warn!(url = %endpoint.url, attempt, error = %e, "RPC probe failed");
            }
            Err(_) => {
                tracing::warn!(url = %endpoint.url, attempt, "RPC probe timed out");
            }
        }
        if attempt < attempts {
            sleep(calculate_backoff(attempt, retry)).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::SendFailure;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// JSON-RPC node on localhost answering from a script.
    #[derive(Default)]
    struct StubNode {
        chain_id: u64,
        results: HashMap<&'static str, Value>,
        errors: HashMap<&'static str, (i64, &'static str)>,
        hits: Mutex<Vec<String>>,
    }

    impl StubNode {
        fn new(chain_id: u64) -> Self {
            Self {
                chain_id,
                ..Self::default()
            }
        }

        fn answer(mut self, method: &'static str, result: Value) -> Self {
            self.results.insert(method, result);
            self
        }

        fn fail(mut self, method: &'static str, code: i64, message: &'static str) -> Self {
            self.errors.insert(method, (code, message));
            self
        }

        fn hits(&self, method: &str) -> usize {
            self.hits.lock().unwrap().iter().filter(|m| *m == method).count()
        }
    }

    async fn handle(State(node): State<Arc<StubNode>>, Json(request): Json<Value>) -> Json<Value> {
        let id = request["id"].clone();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        node.hits.lock().unwrap().push(method.clone());

        let body = if let Some((code, message)) = node.errors.get(method.as_str()) {
            json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
        } else if method == "eth_chainId" {
            json!({ "jsonrpc": "2.0", "id": id, "result": format!("0x{:x}", node.chain_id) })
        } else if let Some(result) = node.results.get(method.as_str()) {
            json!({ "jsonrpc": "2.0", "id": id, "result": result })
        } else {
            json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32601, "message": "method not found" } })
        };
        Json(body)
    }

    async fn serve(node: StubNode) -> (String, Arc<StubNode>) {
        let node = Arc::new(node);
        let app = Router::new().route("/", post(handle)).with_state(node.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (url, node)
    }

    async fn connect_to(
        primary: &str,
        fallbacks: &[&str],
        chain_id: u64,
        strict: bool,
    ) -> BlockchainResult<BlockchainClient> {
        let config = BlockchainConfig {
            rpc_url: primary.to_string(),
            failover_urls: fallbacks.iter().map(|url| url.to_string()).collect(),
            chain_id,
            strict_chain_id: strict,
            rpc_timeout_secs: 2,
            ..BlockchainConfig::default()
        };
        BlockchainClient::connect(config, &SessionHeaders::new("test"), &fast_retry()).await
    }

    fn test_config() -> BlockchainConfig {
        BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 1,
            ..BlockchainConfig::default()
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..RetryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_connect_fails_when_nothing_answers() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());

        let result = BlockchainClient::connect(config, &SessionHeaders::new("test"), &fast_retry()).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to connect to any RPC endpoint"));
    }

    #[tokio::test]
    async fn test_no_valid_endpoints() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        config.failover_urls = vec![String::new()];

        let result = BlockchainClient::connect(config, &SessionHeaders::new("test"), &fast_retry()).await;
        assert!(result.unwrap_err().to_string().contains("no valid RPC endpoints"));
    }

    #[test]
    fn test_session_headers_are_unique() {
        let a = SessionHeaders::new("agent");
        let b = SessionHeaders::new("agent");
        assert_ne!(a.request_id, b.request_id);
        assert!(http_client(&a, Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_reads_fail_over_in_priority_order() {
        let (a_url, a) = serve(StubNode::new(31337).fail("eth_blockNumber", -32000, "header not found")).await;
        let (b_url, b) = serve(StubNode::new(31337).answer("eth_blockNumber", json!("0x10"))).await;

        let client = connect_to(&a_url, &[&b_url], 31337, false).await.unwrap();
        assert_eq!(client.endpoint_urls(), vec![a_url.as_str(), b_url.as_str()]);

        assert_eq!(ChainRpc::block_number(&client).await.unwrap(), 16);
        assert_eq!(a.hits("eth_blockNumber"), 1);
        assert_eq!(b.hits("eth_blockNumber"), 1);
    }

    #[tokio::test]
    async fn test_revert_is_returned_without_failover() {
        let (a_url, _a) =
            serve(StubNode::new(31337).fail("eth_call", 3, "execution reverted: name taken")).await;
        let (b_url, b) = serve(StubNode::new(31337).answer("eth_call", json!("0x01"))).await;

        let client = connect_to(&a_url, &[&b_url], 31337, false).await.unwrap();
        let err = ChainRpc::call(&client, TransactionRequest::default()).await.unwrap_err();

        assert!(matches!(err, BlockchainError::Reverted(_)), "{err:?}");
        assert_eq!(b.hits("eth_call"), 0);
    }

    #[tokio::test]
    async fn test_send_raw_returns_node_rejection() {
        let (a_url, a) = serve(StubNode::new(31337).fail("eth_sendRawTransaction", -32000, "nonce too low")).await;
        let (b_url, b) = serve(
            StubNode::new(31337).answer("eth_sendRawTransaction", json!(format!("0x{}", "11".repeat(32)))),
        )
        .await;

        let client = connect_to(&a_url, &[&b_url], 31337, false).await.unwrap();
        let err = client
            .send_raw(Bytes::from_static(&[0x02, 0xc0]))
            .await
            .unwrap_err();

        assert!(matches!(err, BlockchainError::Rpc(_)), "{err:?}");
        assert_eq!(SendFailure::classify(&err.to_string()), SendFailure::NonceTooLow);
        assert_eq!(a.hits("eth_sendRawTransaction"), 1);
        assert_eq!(b.hits("eth_sendRawTransaction"), 0);
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_adopts_network_id() {
        let (url, _node) = serve(StubNode::new(688689)).await;

        let client = connect_to(&url, &[], 688688, false).await.unwrap();
        assert_eq!(client.signing_chain_id(), 688689);
        assert_eq!(ChainRpc::chain_id(&client).await.unwrap(), 688689);
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_is_fatal_when_strict() {
        let (url, _node) = serve(StubNode::new(688689)).await;

        let err = connect_to(&url, &[], 688688, true).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::ChainMismatch {
                expected: 688688,
                actual: 688689
            }
        ));
    }

    #[tokio::test]
    async fn test_live_fallback_moves_to_front() {
        let dead = "http://127.0.0.1:1";
        let (b_url, b) = serve(StubNode::new(31337).answer("eth_blockNumber", json!("0x20"))).await;

        let client = connect_to(dead, &[&b_url], 31337, false).await.unwrap();
        assert_eq!(client.endpoint_urls(), vec![b_url.as_str(), dead]);

        assert_eq!(ChainRpc::block_number(&client).await.unwrap(), 32);
        assert_eq!(b.hits("eth_blockNumber"), 1);
    }
}
