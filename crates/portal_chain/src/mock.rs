//! Scripted in-memory RPC client and factory for tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::chain::ChainDescriptor;
use crate::client::ClientFactory;
use crate::move_types::FunctionCall;
use crate::rpc::{
    BalanceInfo, ObjectStateFilter, ObjectStateView, PageQuery, PageView, RoochRpc, RpcError,
    UtxoFilter, UtxoView, ViewFunctionResult,
};

#[derive(Default)]
struct Script {
    objects: BTreeMap<String, Vec<ObjectStateView>>,
    utxos: BTreeMap<String, Vec<UtxoView>>,
    balances: BTreeMap<String, BalanceInfo>,
    view_results: VecDeque<Result<ViewFunctionResult, String>>,
    failing: BTreeMap<&'static str, String>,
    gates: BTreeMap<&'static str, Arc<Notify>>,
    calls: Vec<String>,
    view_calls: Vec<FunctionCall>,
}

/// [`RoochRpc`] answering from canned data. Every call is logged by method name.
pub struct MockRpc {
    chain: ChainDescriptor,
    script: Mutex<Script>,
}

impl MockRpc {
    pub fn new(chain: ChainDescriptor) -> Self {
        Self {
            chain,
            script: Mutex::new(Script::default()),
        }
    }

    /// Objects returned for an `object_type` or `object_id` filter equal to `key`.
    pub fn with_objects(self, key: impl Into<String>, states: Vec<ObjectStateView>) -> Self {
        self.script.lock().objects.insert(key.into(), states);
        self
    }

    pub fn with_utxos(self, owner: impl Into<String>, utxos: Vec<UtxoView>) -> Self {
        self.script.lock().utxos.insert(owner.into(), utxos);
        self
    }

    pub fn with_balance(self, balance: BalanceInfo) -> Self {
        self.set_balance(balance);
        self
    }

    pub fn set_balance(&self, balance: BalanceInfo) {
        self.script
            .lock()
            .balances
            .insert(balance.coin_type.clone(), balance);
    }

    /// Queue the result of the next view-function call.
    pub fn push_view_result(&self, result: ViewFunctionResult) {
        self.script.lock().view_results.push_back(Ok(result));
    }

    pub fn push_view_error(&self, message: impl Into<String>) {
        self.script.lock().view_results.push_back(Err(message.into()));
    }

    /// Make every call to `method` fail with a transport error.
    pub fn fail(&self, method: &'static str, message: impl Into<String>) {
        self.script.lock().failing.insert(method, message.into());
    }

    /// Park the next call to `method` until the returned handle is notified.
    pub fn hold(&self, method: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script.lock().gates.insert(method, gate.clone());
        gate
    }

    async fn pass_gate(&self, method: &'static str) {
        let gate = self.script.lock().gates.remove(method);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    /// Method names called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.as_str() == method)
            .count()
    }

    pub fn view_calls(&self) -> Vec<FunctionCall> {
        self.script.lock().view_calls.clone()
    }

    fn record(&self, method: &'static str) -> Result<(), RpcError> {
        let mut script = self.script.lock();
        script.calls.push(method.to_string());
        match script.failing.get(method) {
            Some(message) => Err(RpcError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

pub mod methods {
    pub const GET_CHAIN_ID: &str = "get_chain_id";
    pub const QUERY_OBJECT_STATES: &str = "query_object_states";
    pub const GET_BALANCE: &str = "get_balance";
    pub const GET_BALANCES: &str = "get_balances";
    pub const EXECUTE_VIEW_FUNCTION: &str = "execute_view_function";
    pub const QUERY_UTXOS: &str = "query_utxos";
}

#[async_trait]
impl RoochRpc for MockRpc {
    fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    async fn get_chain_id(&self) -> Result<u64, RpcError> {
        self.pass_gate(methods::GET_CHAIN_ID).await;
        self.record(methods::GET_CHAIN_ID)?;
        Ok(self.chain.id)
    }

    async fn query_object_states(
        &self,
        filter: ObjectStateFilter,
        _page: PageQuery,
    ) -> Result<PageView<ObjectStateView>, RpcError> {
        self.pass_gate(methods::QUERY_OBJECT_STATES).await;
        self.record(methods::QUERY_OBJECT_STATES)?;
        let key = match filter {
            ObjectStateFilter::ObjectType(t) => t,
            ObjectStateFilter::ObjectId(id) => id,
            ObjectStateFilter::Owner(owner) => owner,
        };
        let data = self.script.lock().objects.get(&key).cloned().unwrap_or_default();
        Ok(PageView::single(data))
    }

    async fn get_balance(&self, _owner: &str, coin_type: &str) -> Result<BalanceInfo, RpcError> {
        self.pass_gate(methods::GET_BALANCE).await;
        self.record(methods::GET_BALANCE)?;
        self.script
            .lock()
            .balances
            .get(coin_type)
            .cloned()
            .ok_or_else(|| RpcError::Rpc {
                code: -32000,
                message: format!("no balance for {coin_type}"),
            })
    }

    async fn get_balances(
        &self,
        _owner: &str,
        _page: PageQuery,
    ) -> Result<PageView<BalanceInfo>, RpcError> {
        self.pass_gate(methods::GET_BALANCES).await;
        self.record(methods::GET_BALANCES)?;
        let data = self.script.lock().balances.values().cloned().collect();
        Ok(PageView::single(data))
    }

    async fn execute_view_function(
        &self,
        call: FunctionCall,
    ) -> Result<ViewFunctionResult, RpcError> {
        self.pass_gate(methods::EXECUTE_VIEW_FUNCTION).await;
        self.record(methods::EXECUTE_VIEW_FUNCTION)?;
        let mut script = self.script.lock();
        script.view_calls.push(call);
        match script.view_results.pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(RpcError::Transport(message)),
            None => Err(RpcError::Transport("no scripted view result".into())),
        }
    }

    async fn query_utxos(
        &self,
        filter: UtxoFilter,
        _page: PageQuery,
    ) -> Result<PageView<UtxoView>, RpcError> {
        self.pass_gate(methods::QUERY_UTXOS).await;
        self.record(methods::QUERY_UTXOS)?;
        let UtxoFilter::Owner(owner) = filter;
        let data = self.script.lock().utxos.get(&owner).cloned().unwrap_or_default();
        Ok(PageView::single(data))
    }
}

/// [`ClientFactory`] handing out [`MockRpc`]s and recording each connect.
#[derive(Default)]
pub struct MockFactory {
    fixed: Option<Arc<MockRpc>>,
    fail_next: Mutex<Option<String>>,
    connected: Mutex<Vec<ChainDescriptor>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `client`, whatever chain is requested.
    pub fn with_client(client: Arc<MockRpc>) -> Self {
        Self {
            fixed: Some(client),
            ..Default::default()
        }
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    pub fn connected(&self) -> Vec<ChainDescriptor> {
        self.connected.lock().clone()
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn connect(&self, chain: &ChainDescriptor) -> Result<Arc<dyn RoochRpc>, RpcError> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(RpcError::Transport(message));
        }
        self.connected.lock().push(chain.clone());
        match &self.fixed {
            Some(client) => Ok(client.clone()),
            None => Ok(Arc::new(MockRpc::new(chain.clone()))),
        }
    }
}
