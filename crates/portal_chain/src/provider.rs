//! Process-wide chain context.
//!
//! `ChainProvider` owns the client for the active chain and the user's list of
//! custom chains. Both are persisted through a [`KeyValueStore`]: the active
//! chain as its hex chain id, the custom list as a JSON array. Consumers hold
//! an `Arc<ChainProvider>`, read [`ChainProvider::client`] per request, and
//! listen on [`ChainProvider::subscribe`] to learn when the chain changes.

use std::sync::Arc;

use parking_lot::RwLock;
use portal_core::storage::{self, KeyValueStore, StorageError, keys};
use portal_core::RequestGeneration;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::chain::{ChainDescriptor, builtin_chains};
use crate::client::ClientFactory;
use crate::rpc::{RoochRpc, RpcError};

const EVENT_CAPACITY: usize = 16;

/// Lifecycle of the provider. Transitions only move forward, except that a
/// failed `initialize` returns to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Loading,
    Ready,
    Closed,
}

/// Broadcast to subscribers whenever the active chain changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    Changed {
        chain: ChainDescriptor,
        generation: u64,
    },
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Chain provider is not ready")]
    NotReady,

    #[error("Chain provider has been closed")]
    Closed,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to connect to {chain}: {source}")]
    Connect {
        chain: String,
        #[source]
        source: RpcError,
    },
}

struct Inner {
    state: ProviderState,
    client: Option<Arc<dyn RoochRpc>>,
    active: Option<ChainDescriptor>,
}

pub struct ChainProvider {
    store: Arc<dyn KeyValueStore>,
    factory: Arc<dyn ClientFactory>,
    inner: RwLock<Inner>,
    /// Serializes switches so a slow connect cannot overwrite a newer one.
    switching: Mutex<()>,
    events: broadcast::Sender<ChainEvent>,
    generation: RequestGeneration,
}

impl ChainProvider {
    pub fn new(store: Arc<dyn KeyValueStore>, factory: Arc<dyn ClientFactory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            factory,
            inner: RwLock::new(Inner {
                state: ProviderState::Uninitialized,
                client: None,
                active: None,
            }),
            switching: Mutex::new(()),
            events,
            generation: RequestGeneration::new(),
        }
    }

    pub fn state(&self) -> ProviderState {
        self.inner.read().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ProviderState::Ready
    }

    /// Live client for the active chain, `None` until ready.
    pub fn client(&self) -> Option<Arc<dyn RoochRpc>> {
        let inner = self.inner.read();
        match inner.state {
            ProviderState::Ready => inner.client.clone(),
            _ => None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }

    /// Generation of the current binding; bumps on every rebind.
    pub fn generation(&self) -> u64 {
        self.generation.current().value()
    }

    /// Resolve the stored active chain, bind a client to it and become ready.
    pub async fn initialize(&self) -> Result<(), ProviderError> {
        let _guard = self.switching.lock().await;
        {
            let mut inner = self.inner.write();
            match inner.state {
                ProviderState::Ready => return Ok(()),
                ProviderState::Closed => return Err(ProviderError::Closed),
                ProviderState::Uninitialized | ProviderState::Loading => {
                    inner.state = ProviderState::Loading;
                }
            }
        }

        let chain = match self.resolve_stored_active() {
            Ok(chain) => chain,
            Err(e) => {
                self.inner.write().state = ProviderState::Uninitialized;
                return Err(e);
            }
        };

        let client = match self.connect(&chain).await {
            Ok(client) => client,
            Err(e) => {
                self.inner.write().state = ProviderState::Uninitialized;
                return Err(e);
            }
        };

        {
            let mut inner = self.inner.write();
            if inner.state == ProviderState::Closed {
                return Err(ProviderError::Closed);
            }
            inner.client = Some(client);
            inner.active = Some(chain.clone());
            inner.state = ProviderState::Ready;
        }
        let generation = self.generation.advance().value();
        info!(chain = %chain.name, chain_id = %chain.chain_id, url = %chain.url, "chain provider ready");
        let _ = self.events.send(ChainEvent::Changed { chain, generation });
        Ok(())
    }

    /// Built-in chains followed by the persisted custom chains.
    pub fn list_chains(&self) -> Result<Vec<ChainDescriptor>, ProviderError> {
        let mut chains = builtin_chains();
        chains.extend(self.custom_chains()?);
        Ok(chains)
    }

    pub fn custom_chains(&self) -> Result<Vec<ChainDescriptor>, ProviderError> {
        Ok(storage::get_json(self.store.as_ref(), keys::CUSTOM_CHAINS)?.unwrap_or_default())
    }

    /// The chain currently bound, or the stored pointer resolved against the
    /// chain list when nothing is bound yet.
    pub fn active_chain(&self) -> Result<ChainDescriptor, ProviderError> {
        if let Some(active) = self.inner.read().active.clone() {
            return Ok(active);
        }
        self.resolve_stored_active()
    }

    /// Switch to `chain` and, only if that succeeds, remember it as a custom
    /// chain. An entry with the same id and url is not stored twice.
    pub async fn add_chain(&self, chain: ChainDescriptor) -> Result<(), ProviderError> {
        self.switch_chain(chain.clone()).await?;

        let mut custom = self.custom_chains()?;
        if custom.iter().any(|c| c.same_endpoint(&chain)) {
            debug!(chain = %chain.name, "chain already stored");
            return Ok(());
        }
        custom.push(chain);
        storage::set_json(self.store.as_ref(), keys::CUSTOM_CHAINS, &custom)?;
        Ok(())
    }

    /// Rebind to `chain`. Returns `false` without touching storage when it is
    /// already the active chain.
    pub async fn switch_chain(&self, chain: ChainDescriptor) -> Result<bool, ProviderError> {
        let _guard = self.switching.lock().await;
        self.ensure_ready()?;
        if self
            .inner
            .read()
            .active
            .as_ref()
            .is_some_and(|active| active.same_endpoint(&chain))
        {
            return Ok(false);
        }
        self.rebind(chain).await?;
        Ok(true)
    }

    /// Switch to the listed chain whose `chain_id` matches. Returns `false`
    /// when the id is unknown, already active, or the provider is not ready.
    pub async fn switch_chain_by_id(&self, chain_id: &str) -> Result<bool, ProviderError> {
        if !self.is_ready() {
            return Ok(false);
        }
        let Some(chain) = self
            .list_chains()?
            .into_iter()
            .find(|c| c.chain_id == chain_id)
        else {
            warn!(chain_id, "no chain with this id");
            return Ok(false);
        };
        let already_active = self
            .inner
            .read()
            .active
            .as_ref()
            .is_some_and(|a| a.chain_id == chain_id);
        if already_active {
            return Ok(false);
        }
        self.switch_chain(chain).await
    }

    /// Remove every custom chain with `chain.id`. When the active chain is
    /// among them the provider falls back to the dev chain. Nothing is
    /// written once the provider is closed.
    pub async fn delete_chain(&self, chain: &ChainDescriptor) -> Result<(), ProviderError> {
        let _guard = self.switching.lock().await;
        if self.state() == ProviderState::Closed {
            return Err(ProviderError::Closed);
        }

        let custom = self.custom_chains()?;
        let before = custom.len();
        let remaining: Vec<ChainDescriptor> =
            custom.into_iter().filter(|c| c.id != chain.id).collect();
        if remaining.len() != before {
            storage::set_json(self.store.as_ref(), keys::CUSTOM_CHAINS, &remaining)?;
            info!(chain = %chain.name, removed = before - remaining.len(), "custom chain deleted");
        }

        let active_deleted = self
            .inner
            .read()
            .active
            .as_ref()
            .is_some_and(|a| a.id == chain.id && !builtin_chains().iter().any(|b| b.same_endpoint(a)));
        if active_deleted {
            self.rebind(ChainDescriptor::dev()).await?;
        }
        Ok(())
    }

    /// Drop the client. Later calls see `Closed`.
    pub fn teardown(&self) {
        let mut inner = self.inner.write();
        if inner.state == ProviderState::Closed {
            return;
        }
        inner.client = None;
        inner.state = ProviderState::Closed;
        drop(inner);
        info!("chain provider closed");
        let _ = self.events.send(ChainEvent::Closed);
    }

    // -- internals ----------------------------------------------------------

    fn ensure_ready(&self) -> Result<(), ProviderError> {
        match self.state() {
            ProviderState::Ready => Ok(()),
            ProviderState::Closed => Err(ProviderError::Closed),
            _ => Err(ProviderError::NotReady),
        }
    }

    fn resolve_stored_active(&self) -> Result<ChainDescriptor, ProviderError> {
        let pointer = self.store.get(keys::ACTIVE_CHAIN)?;
        let chains = self.list_chains()?;
        let resolved = pointer
            .as_deref()
            .and_then(|id| chains.into_iter().find(|c| c.chain_id == id));
        Ok(resolved.unwrap_or_else(|| {
            if let Some(id) = pointer {
                warn!(chain_id = %id, "stored active chain not found, using dev chain");
            }
            ChainDescriptor::dev()
        }))
    }

    async fn connect(&self, chain: &ChainDescriptor) -> Result<Arc<dyn RoochRpc>, ProviderError> {
        self.factory
            .connect(chain)
            .await
            .map_err(|source| ProviderError::Connect {
                chain: chain.name.clone(),
                source,
            })
    }

    /// Connect, persist the pointer, then swap the binding under one write
    /// lock and notify. A failure at any step leaves the old binding live.
    /// Callers hold `switching`.
    async fn rebind(&self, chain: ChainDescriptor) -> Result<(), ProviderError> {
        let client = self.connect(&chain).await?;
        self.ensure_ready()?;
        self.store.set(keys::ACTIVE_CHAIN, &chain.chain_id)?;
        {
            let mut inner = self.inner.write();
            if inner.state != ProviderState::Ready {
                return Err(ProviderError::Closed);
            }
            inner.client = Some(client);
            inner.active = Some(chain.clone());
        }
        let generation = self.generation.advance().value();
        info!(chain = %chain.name, chain_id = %chain.chain_id, generation, "switched chain");
        let _ = self.events.send(ChainEvent::Changed { chain, generation });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFactory, MockRpc};
    use portal_core::MemoryStore;

    fn provider_with(store: Arc<MemoryStore>, factory: Arc<MockFactory>) -> ChainProvider {
        ChainProvider::new(store, factory)
    }

    fn custom(id: u64, url: &str) -> ChainDescriptor {
        ChainDescriptor::new(id, format!("custom-{id}"), url)
    }

    #[tokio::test]
    async fn initialize_defaults_to_dev_chain() {
        let store = Arc::new(MemoryStore::new());
        let factory = Arc::new(MockFactory::new());
        let provider = provider_with(store, factory.clone());

        assert_eq!(provider.state(), ProviderState::Uninitialized);
        assert!(provider.client().is_none());

        provider.initialize().await.unwrap();
        assert_eq!(provider.state(), ProviderState::Ready);
        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::dev());
        assert_eq!(provider.client().unwrap().chain().id, 3);
        assert_eq!(factory.connected(), vec![ChainDescriptor::dev()]);
    }

    #[tokio::test]
    async fn initialize_resolves_stored_custom_chain() {
        let store = Arc::new(MemoryStore::new());
        let chain = custom(42, "https://custom.example.com");
        storage::set_json(store.as_ref(), keys::CUSTOM_CHAINS, &vec![chain.clone()]).unwrap();
        store.set(keys::ACTIVE_CHAIN, "0x2a").unwrap();

        let provider = provider_with(store, Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();
        assert_eq!(provider.active_chain().unwrap(), chain);
    }

    #[tokio::test]
    async fn unknown_pointer_falls_back_to_dev() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::ACTIVE_CHAIN, "0x999").unwrap();
        let provider = provider_with(store, Arc::new(MockFactory::new()));
        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::dev());
    }

    #[tokio::test]
    async fn failed_initialize_can_retry() {
        let factory = Arc::new(MockFactory::new());
        factory.fail_next("boom");
        let provider = provider_with(Arc::new(MemoryStore::new()), factory);

        assert!(matches!(
            provider.initialize().await,
            Err(ProviderError::Connect { .. })
        ));
        assert_eq!(provider.state(), ProviderState::Uninitialized);

        provider.initialize().await.unwrap();
        assert!(provider.is_ready());
    }

    #[tokio::test]
    async fn list_chains_puts_builtins_first() {
        let store = Arc::new(MemoryStore::new());
        let extra = custom(9, "https://nine.example.com");
        storage::set_json(store.as_ref(), keys::CUSTOM_CHAINS, &vec![extra.clone()]).unwrap();
        let provider = provider_with(store, Arc::new(MockFactory::new()));

        let chains = provider.list_chains().unwrap();
        assert_eq!(chains.len(), 5);
        assert_eq!(chains[0], ChainDescriptor::local());
        assert_eq!(chains[4], extra);
    }

    #[tokio::test]
    async fn add_chain_persists_after_successful_switch() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider_with(store.clone(), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();

        let chain = custom(7, "https://seven.example.com");
        provider.add_chain(chain.clone()).await.unwrap();

        assert_eq!(provider.custom_chains().unwrap(), vec![chain.clone()]);
        assert_eq!(store.get(keys::ACTIVE_CHAIN).unwrap().as_deref(), Some("0x7"));
        assert_eq!(provider.active_chain().unwrap(), chain);
    }

    #[tokio::test]
    async fn add_chain_does_not_persist_on_switch_failure() {
        let store = Arc::new(MemoryStore::new());
        let factory = Arc::new(MockFactory::new());
        let provider = provider_with(store.clone(), factory.clone());
        provider.initialize().await.unwrap();

        factory.fail_next("unreachable");
        let err = provider
            .add_chain(custom(7, "https://seven.example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Connect { .. }));
        assert!(store.get(keys::CUSTOM_CHAINS).unwrap().is_none());
        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::dev());
    }

    #[tokio::test]
    async fn add_chain_skips_duplicate_entry() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider_with(store, Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();

        let chain = custom(7, "https://seven.example.com");
        provider.add_chain(chain.clone()).await.unwrap();
        provider.switch_chain(ChainDescriptor::test()).await.unwrap();
        provider.add_chain(chain.clone()).await.unwrap();

        assert_eq!(provider.custom_chains().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn switch_to_active_chain_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let factory = Arc::new(MockFactory::new());
        let provider = provider_with(store.clone(), factory.clone());
        provider.initialize().await.unwrap();
        let writes = store.write_count();
        let generation = provider.generation();

        let switched = provider.switch_chain(ChainDescriptor::dev()).await.unwrap();
        assert!(!switched);
        assert_eq!(store.write_count(), writes);
        assert_eq!(provider.generation(), generation);
        assert_eq!(factory.connected().len(), 1);
    }

    #[tokio::test]
    async fn switch_emits_change_event() {
        let provider = provider_with(Arc::new(MemoryStore::new()), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();
        let mut events = provider.subscribe();

        assert!(provider.switch_chain(ChainDescriptor::test()).await.unwrap());
        match events.recv().await.unwrap() {
            ChainEvent::Changed { chain, generation } => {
                assert_eq!(chain, ChainDescriptor::test());
                assert_eq!(generation, provider.generation());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(provider.client().unwrap().chain().id, 2);
    }

    #[tokio::test]
    async fn switch_before_ready_is_rejected() {
        let provider = provider_with(Arc::new(MemoryStore::new()), Arc::new(MockFactory::new()));
        assert!(matches!(
            provider.switch_chain(ChainDescriptor::test()).await,
            Err(ProviderError::NotReady)
        ));
        assert!(!provider.switch_chain_by_id("0x2").await.unwrap());
    }

    #[tokio::test]
    async fn switch_by_id_resolves_listed_chain() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider_with(store.clone(), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();

        assert!(provider.switch_chain_by_id("0x1").await.unwrap());
        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::main());
        assert!(!provider.switch_chain_by_id("0x1").await.unwrap());
        assert!(!provider.switch_chain_by_id("0xdead").await.unwrap());
        assert_eq!(store.get(keys::ACTIVE_CHAIN).unwrap().as_deref(), Some("0x1"));
    }

    #[tokio::test]
    async fn delete_inactive_chain_keeps_binding() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider_with(store, Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();

        let chain = custom(7, "https://seven.example.com");
        provider.add_chain(chain.clone()).await.unwrap();
        provider.switch_chain(ChainDescriptor::test()).await.unwrap();

        provider.delete_chain(&chain).await.unwrap();
        assert!(provider.custom_chains().unwrap().is_empty());
        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::test());
    }

    #[tokio::test]
    async fn delete_active_chain_falls_back_to_dev() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider_with(store.clone(), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();

        let chain = custom(7, "https://seven.example.com");
        provider.add_chain(chain.clone()).await.unwrap();
        let mut events = provider.subscribe();

        provider.delete_chain(&chain).await.unwrap();
        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::dev());
        assert_eq!(store.get(keys::ACTIVE_CHAIN).unwrap().as_deref(), Some("0x3"));
        assert!(matches!(
            events.recv().await.unwrap(),
            ChainEvent::Changed { chain, .. } if chain == ChainDescriptor::dev()
        ));
    }

    #[tokio::test]
    async fn teardown_closes_provider() {
        let provider = provider_with(Arc::new(MemoryStore::new()), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();
        let mut events = provider.subscribe();

        provider.teardown();
        assert_eq!(provider.state(), ProviderState::Closed);
        assert!(provider.client().is_none());
        assert_eq!(events.recv().await.unwrap(), ChainEvent::Closed);
        assert!(matches!(provider.initialize().await, Err(ProviderError::Closed)));
        assert!(matches!(
            provider.switch_chain(ChainDescriptor::test()).await,
            Err(ProviderError::Closed)
        ));
    }

    #[tokio::test]
    async fn client_is_shared_across_reads() {
        let rpc = Arc::new(MockRpc::new(ChainDescriptor::dev()));
        let factory = Arc::new(MockFactory::with_client(rpc.clone()));
        let provider = provider_with(Arc::new(MemoryStore::new()), factory);
        provider.initialize().await.unwrap();

        let a = provider.client().unwrap();
        let b = provider.client().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    /// Memory store whose writes to one key can be made to fail.
    #[derive(Default)]
    struct ReadOnlyKey {
        inner: MemoryStore,
        locked: parking_lot::Mutex<Option<&'static str>>,
    }

    impl KeyValueStore for ReadOnlyKey {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if *self.locked.lock() == Some(key) {
                return Err(StorageError::Io {
                    path: "storage.json".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn failed_pointer_write_keeps_old_binding() {
        let store = Arc::new(ReadOnlyKey::default());
        let provider = ChainProvider::new(store.clone(), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();
        let generation = provider.generation();
        let mut events = provider.subscribe();

        *store.locked.lock() = Some(keys::ACTIVE_CHAIN);
        let chain = custom(7, "https://seven.example.com");
        assert!(matches!(
            provider.add_chain(chain).await,
            Err(ProviderError::Storage(_))
        ));

        assert_eq!(provider.active_chain().unwrap(), ChainDescriptor::dev());
        assert_eq!(provider.client().unwrap().chain().id, 3);
        assert_eq!(provider.generation(), generation);
        assert!(provider.custom_chains().unwrap().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn delete_after_teardown_leaves_storage_alone() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider_with(store.clone(), Arc::new(MockFactory::new()));
        provider.initialize().await.unwrap();
        let chain = custom(7, "https://seven.example.com");
        provider.add_chain(chain.clone()).await.unwrap();
        provider.teardown();
        let writes = store.write_count();

        assert!(matches!(
            provider.delete_chain(&chain).await,
            Err(ProviderError::Closed)
        ));
        assert_eq!(store.write_count(), writes);
        assert_eq!(provider.custom_chains().unwrap(), vec![chain]);
    }
}
