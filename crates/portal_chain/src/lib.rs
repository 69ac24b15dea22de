pub mod chain;
pub mod client;
pub mod jsonrpc;
pub mod move_types;
pub mod provider;
pub mod rpc;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use chain::{ChainDescriptor, ChainOptions, builtin_chains, chain_id_hex, validate_url};
pub use client::{ClientFactory, HttpClientFactory, RoochHttpClient};
pub use move_types::{AccountAddress, FunctionCall, MoveArg, MoveTypeError, ObjectId};
pub use provider::{ChainEvent, ChainProvider, ProviderError, ProviderState};
pub use rpc::{
    BalanceInfo, ObjectStateFilter, ObjectStateView, PageQuery, PageView, QueryOptions,
    ReturnValueView, RoochRpc, RpcError, UtxoFilter, UtxoView, ViewFunctionResult, VmStatus,
};
