//! HTTP JSON-RPC client for a Rooch node.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::chain::{ChainDescriptor, validate_url};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse, methods};
use crate::move_types::FunctionCall;
use crate::rpc::{
    BalanceInfo, ObjectStateFilter, ObjectStateView, PageQuery, PageView, RoochRpc, RpcError,
    UtxoFilter, UtxoView, ViewFunctionResult, value_to_u128,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct RoochHttpClient {
    chain: ChainDescriptor,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RoochHttpClient {
    pub fn new(chain: ChainDescriptor, timeout: Duration) -> Result<Self, RpcError> {
        if !validate_url(&chain.url) {
            return Err(RpcError::InvalidUrl(chain.url.clone()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            chain,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send one JSON-RPC call and decode its `result`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(method, params, id);
        debug!(chain = %self.chain.name, method, id, "rpc request");

        let resp = self
            .http
            .post(&self.chain.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(chain = %self.chain.name, method, status = status.as_u16(), "rpc http error");
            return Err(RpcError::HttpStatus(status.as_u16()));
        }

        let body: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("JSON parse error: {e}")))?;

        if let Some(err) = body.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::Decode(format!("{method}: {e}")))
    }
}

fn limit_param(page: &PageQuery) -> Value {
    page.limit
        .map(|l| Value::String(l.to_string()))
        .unwrap_or(Value::Null)
}

/// Chain ids come back as a number, a decimal string or a `0x` hex string.
fn parse_chain_id(value: &Value) -> Option<u64> {
    if let Some(hex) = value.as_str().and_then(|s| s.strip_prefix("0x")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    value_to_u128(value).and_then(|v| u64::try_from(v).ok())
}

#[async_trait]
impl RoochRpc for RoochHttpClient {
    fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    async fn get_chain_id(&self) -> Result<u64, RpcError> {
        let raw: Value = self.call(methods::GET_CHAIN_ID, json!([])).await?;
        parse_chain_id(&raw).ok_or_else(|| RpcError::Decode(format!("chain id {raw}")))
    }

    async fn query_object_states(
        &self,
        filter: ObjectStateFilter,
        page: PageQuery,
    ) -> Result<PageView<ObjectStateView>, RpcError> {
        let limit = limit_param(&page);
        let params = json!([filter, page.cursor, limit, page.options]);
        self.call(methods::QUERY_OBJECT_STATES, params).await
    }

    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<BalanceInfo, RpcError> {
        self.call(methods::GET_BALANCE, json!([owner, coin_type]))
            .await
    }

    async fn get_balances(
        &self,
        owner: &str,
        page: PageQuery,
    ) -> Result<PageView<BalanceInfo>, RpcError> {
        let limit = limit_param(&page);
        let params = json!([owner, page.cursor, limit]);
        self.call(methods::GET_BALANCES, params).await
    }

    async fn execute_view_function(
        &self,
        call: FunctionCall,
    ) -> Result<ViewFunctionResult, RpcError> {
        let view = call.to_view()?;
        self.call(methods::EXECUTE_VIEW_FUNCTION, json!([view]))
            .await
    }

    async fn query_utxos(
        &self,
        filter: UtxoFilter,
        page: PageQuery,
    ) -> Result<PageView<UtxoView>, RpcError> {
        let limit = limit_param(&page);
        let params = json!([filter, page.cursor, limit, page.options]);
        self.call(methods::QUERY_UTXOS, params).await
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds a client bound to one chain.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, chain: &ChainDescriptor) -> Result<Arc<dyn RoochRpc>, RpcError>;
}

/// Creates [`RoochHttpClient`]s, optionally probing the node's chain id.
pub struct HttpClientFactory {
    timeout: Duration,
    verify_chain_id: bool,
}

impl HttpClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            verify_chain_id: false,
        }
    }

    /// Reject nodes whose reported chain id differs from the descriptor.
    pub fn verify_chain_id(mut self, verify: bool) -> Self {
        self.verify_chain_id = verify;
        self
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    async fn connect(&self, chain: &ChainDescriptor) -> Result<Arc<dyn RoochRpc>, RpcError> {
        let client = RoochHttpClient::new(chain.clone(), self.timeout)?;
        if self.verify_chain_id {
            let actual = client.get_chain_id().await?;
            if actual != chain.id {
                return Err(RpcError::ChainMismatch {
                    expected: chain.id,
                    actual,
                });
            }
        }
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_types::MoveArg;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chain_for(server: &MockServer) -> ChainDescriptor {
        ChainDescriptor::new(3, "mock", server.uri())
    }

    fn client_for(server: &MockServer) -> RoochHttpClient {
        RoochHttpClient::new(chain_for(server), Duration::from_secs(5)).unwrap()
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    #[test]
    fn rejects_invalid_url() {
        let chain = ChainDescriptor::new(9, "bad", "not a url");
        assert!(matches!(
            RoochHttpClient::new(chain, Duration::from_secs(1)),
            Err(RpcError::InvalidUrl(_))
        ));
    }

    #[test]
    fn chain_id_formats() {
        assert_eq!(parse_chain_id(&json!("0x3")), Some(3));
        assert_eq!(parse_chain_id(&json!("20230103")), Some(20230103));
        assert_eq!(parse_chain_id(&json!(2)), Some(2));
        assert_eq!(parse_chain_id(&json!(null)), None);
    }

    #[tokio::test]
    async fn get_balance_sends_owner_and_coin_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "rooch_getBalance",
                "params": ["rooch1owner", "0x3::gas_coin::RGas"]
            })))
            .respond_with(ok(json!({
                "coin_type": "0x3::gas_coin::RGas",
                "name": "Rooch Gas Coin",
                "symbol": "RGAS",
                "decimals": 8,
                "balance": "250000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let balance = client_for(&server)
            .get_balance("rooch1owner", "0x3::gas_coin::RGas")
            .await
            .unwrap();
        assert_eq!(balance.balance, 250_000_000);
    }

    #[tokio::test]
    async fn view_function_args_are_hex_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "rooch_executeViewFunction",
                "params": [{ "function_id": "0x1::m::f", "ty_args": [], "args": ["0x01"] }]
            })))
            .respond_with(ok(json!({
                "vm_status": "Executed",
                "return_values": [{ "decoded_value": "42" }]
            })))
            .mount(&server)
            .await;

        let call = FunctionCall::new("0x1::m::f", vec![MoveArg::Bool(true)]);
        let result = client_for(&server).execute_view_function(call).await.unwrap();
        assert_eq!(result.first_u128(), Some(42));
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": -32602, "message": "invalid params" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get_chain_id().await.unwrap_err();
        assert!(matches!(err, RpcError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn http_failure_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query_utxos(UtxoFilter::Owner("bc1q".into()), PageQuery::first(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::HttpStatus(503)));
    }

    #[tokio::test]
    async fn object_query_sends_string_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "rooch_queryObjectStates",
                "params": [{ "object_type": "0x1::m::T" }, null, "5", { "decode": true, "descending_order": true }]
            })))
            .respond_with(ok(json!({ "data": [], "next_cursor": null, "has_next_page": false })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server)
            .query_object_states(ObjectStateFilter::ObjectType("0x1::m::T".into()), PageQuery::first(5))
            .await
            .unwrap();
        assert!(page.data.is_empty());
    }

    #[tokio::test]
    async fn factory_rejects_chain_id_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok(json!("0x2")))
            .mount(&server)
            .await;

        let factory = HttpClientFactory::new(Duration::from_secs(5)).verify_chain_id(true);
        let err = factory.connect(&chain_for(&server)).await.err().unwrap();
        assert!(matches!(err, RpcError::ChainMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn factory_accepts_matching_chain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok(json!("3")))
            .mount(&server)
            .await;

        let factory = HttpClientFactory::new(Duration::from_secs(5)).verify_chain_id(true);
        let client = factory.connect(&chain_for(&server)).await.unwrap();
        assert_eq!(client.chain().id, 3);
    }
}
