//! Chain RPC client contract and the response views the portal consumes.

use async_trait::async_trait;
use portal_core::parse_amount;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::chain::ChainDescriptor;
use crate::move_types::{FunctionCall, MoveTypeError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by a [`RoochRpc`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error(transparent)]
    Argument(#[from] MoveTypeError),

    #[error("Chain id mismatch: expected {expected}, node reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStateFilter {
    ObjectType(String),
    Owner(String),
    ObjectId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoFilter {
    Owner(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub decode: bool,
    pub descending_order: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            decode: true,
            descending_order: true,
        }
    }
}

/// Cursor, page size and decode options for paginated queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub cursor: Option<Value>,
    pub limit: Option<u64>,
    pub options: QueryOptions,
}

impl PageQuery {
    pub fn first(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Response views
// ---------------------------------------------------------------------------

/// Accepts a JSON number or a decimal string.
pub(crate) fn u128_from_str_or_num<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
    let value = Value::deserialize(d)?;
    value_to_u128(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected unsigned amount, got {value}")))
}

pub(crate) fn value_to_u128(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => parse_amount(s),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<Value>,
    #[serde(default)]
    pub has_next_page: bool,
}

impl<T> PageView<T> {
    pub fn single(data: Vec<T>) -> Self {
        Self {
            data,
            next_cursor: None,
            has_next_page: false,
        }
    }
}

/// An object state, optionally with its decoded Move value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStateView {
    pub id: String,
    pub object_type: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub decoded_value: Option<Value>,
}

impl ObjectStateView {
    /// A field of the decoded struct value (`decoded_value.value.<name>`).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.decoded_value.as_ref()?.get("value")?.get(name)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name)?.as_bool()
    }

    pub fn u128_field(&self, name: &str) -> Option<u128> {
        value_to_u128(self.field(name)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoView {
    pub id: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub decoded_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub coin_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    pub decimals: u8,
    #[serde(deserialize_with = "u128_from_str_or_num")]
    pub balance: u128,
}

/// Outcome reported by the VM for a view call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Executed,
    MoveAbort {
        location: Option<String>,
        abort_code: u64,
    },
    /// Any other status, kept as its JSON text.
    Other(String),
}

impl TryFrom<Value> for VmStatus {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match &value {
            Value::String(s) if s == "Executed" => Ok(VmStatus::Executed),
            Value::Object(map) => match map.get("MoveAbort") {
                Some(abort) => {
                    let abort_code = abort
                        .get("abort_code")
                        .and_then(value_to_u128)
                        .and_then(|c| u64::try_from(c).ok())
                        .ok_or_else(|| format!("MoveAbort without abort_code: {abort}"))?;
                    let location = abort.get("location").map(|l| match l {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    });
                    Ok(VmStatus::MoveAbort {
                        location,
                        abort_code,
                    })
                }
                None => Ok(VmStatus::Other(value.to_string())),
            },
            _ => Ok(VmStatus::Other(value.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for VmStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        VmStatus::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnValueView {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub decoded_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFunctionResult {
    pub vm_status: VmStatus,
    #[serde(default)]
    pub return_values: Option<Vec<ReturnValueView>>,
}

impl ViewFunctionResult {
    /// First decoded return value as an unsigned integer.
    pub fn first_u128(&self) -> Option<u128> {
        let first = self.return_values.as_ref()?.first()?;
        value_to_u128(&first.decoded_value)
    }
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Request/response calls the portal makes against a Rooch node.
#[async_trait]
pub trait RoochRpc: Send + Sync {
    /// The chain this client is bound to.
    fn chain(&self) -> &ChainDescriptor;

    async fn get_chain_id(&self) -> Result<u64, RpcError>;

    async fn query_object_states(
        &self,
        filter: ObjectStateFilter,
        page: PageQuery,
    ) -> Result<PageView<ObjectStateView>, RpcError>;

    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<BalanceInfo, RpcError>;

    async fn get_balances(
        &self,
        owner: &str,
        page: PageQuery,
    ) -> Result<PageView<BalanceInfo>, RpcError>;

    async fn execute_view_function(
        &self,
        call: FunctionCall,
    ) -> Result<ViewFunctionResult, RpcError>;

    async fn query_utxos(
        &self,
        filter: UtxoFilter,
        page: PageQuery,
    ) -> Result<PageView<UtxoView>, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_serialize_as_tagged_objects() {
        let filter = ObjectStateFilter::ObjectType("0x1::m::T".into());
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({"object_type": "0x1::m::T"}));

        let utxo = UtxoFilter::Owner("bc1qowner".into());
        assert_eq!(serde_json::to_value(&utxo).unwrap(), json!({"owner": "bc1qowner"}));
    }

    #[test]
    fn vm_status_executed() {
        let status: VmStatus = serde_json::from_value(json!("Executed")).unwrap();
        assert_eq!(status, VmStatus::Executed);
    }

    #[test]
    fn vm_status_move_abort_with_string_code() {
        let status: VmStatus = serde_json::from_value(json!({
            "MoveAbort": { "location": "0x3::gas_faucet", "abort_code": "4" }
        }))
        .unwrap();
        assert_eq!(
            status,
            VmStatus::MoveAbort {
                location: Some("0x3::gas_faucet".into()),
                abort_code: 4
            }
        );
    }

    #[test]
    fn vm_status_move_abort_with_numeric_code() {
        let status: VmStatus =
            serde_json::from_value(json!({ "MoveAbort": { "abort_code": 2 } })).unwrap();
        assert!(matches!(status, VmStatus::MoveAbort { abort_code: 2, .. }));
    }

    #[test]
    fn vm_status_other_is_preserved() {
        let status: VmStatus = serde_json::from_value(json!("OutOfGas")).unwrap();
        assert_eq!(status, VmStatus::Other("\"OutOfGas\"".into()));
    }

    #[test]
    fn vm_status_abort_without_code_is_rejected() {
        let result: Result<VmStatus, _> =
            serde_json::from_value(json!({ "MoveAbort": { "location": "x" } }));
        assert!(result.is_err());
    }

    #[test]
    fn view_result_first_value_from_string() {
        let result: ViewFunctionResult = serde_json::from_value(json!({
            "vm_status": "Executed",
            "return_values": [{ "value": { "type_tag": "u256", "value": "0x00" }, "decoded_value": "500000000" }]
        }))
        .unwrap();
        assert_eq!(result.first_u128(), Some(500_000_000));
    }

    #[test]
    fn view_result_without_values() {
        let result: ViewFunctionResult =
            serde_json::from_value(json!({ "vm_status": "Executed" })).unwrap();
        assert_eq!(result.first_u128(), None);
    }

    #[test]
    fn balance_accepts_string_amounts() {
        let info: BalanceInfo = serde_json::from_value(json!({
            "coin_type": "0x3::gas_coin::RGas",
            "name": "Rooch Gas Coin",
            "symbol": "RGAS",
            "decimals": 8,
            "balance": "123456789"
        }))
        .unwrap();
        assert_eq!(info.balance, 123_456_789);
        assert_eq!(info.decimals, 8);
    }

    #[test]
    fn object_state_fields() {
        let state: ObjectStateView = serde_json::from_value(json!({
            "id": "0x01",
            "object_type": "0x1::m::T",
            "decoded_value": { "abilities": 12, "type": "0x1::m::T", "value": { "alive": true, "end_time": "1700000000" } }
        }))
        .unwrap();
        assert_eq!(state.bool_field("alive"), Some(true));
        assert_eq!(state.u128_field("end_time"), Some(1_700_000_000));
        assert!(state.field("missing").is_none());
    }
}
