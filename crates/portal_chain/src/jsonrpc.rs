//! JSON-RPC 2.0 envelope types.

use serde::{Deserialize, Serialize};

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: serde_json::Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Option<u64>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Method names exposed by a Rooch node.
pub mod methods {
    pub const GET_CHAIN_ID: &str = "rooch_getChainID";
    pub const QUERY_OBJECT_STATES: &str = "rooch_queryObjectStates";
    pub const GET_BALANCE: &str = "rooch_getBalance";
    pub const GET_BALANCES: &str = "rooch_getBalances";
    pub const EXECUTE_VIEW_FUNCTION: &str = "rooch_executeViewFunction";
    pub const QUERY_UTXOS: &str = "btc_queryUTXOs";
}
