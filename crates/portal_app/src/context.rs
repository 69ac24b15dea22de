use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use portal_chain::{ChainProvider, ClientFactory, HttpClientFactory};
use portal_core::{FileStore, KeyValueStore, NotificationCenter, PortalConfig};
use tracing::debug;

/// Everything a command needs, wired once per run.
pub struct Portal {
    pub config: Arc<PortalConfig>,
    pub store: Arc<dyn KeyValueStore>,
    pub provider: Arc<ChainProvider>,
    pub notices: NotificationCenter,
}

impl Portal {
    /// File-backed storage under `~/.rooch-portal` and HTTP clients.
    pub async fn open(config: PortalConfig) -> Result<Self> {
        let storage_path = PortalConfig::storage_path()?;
        debug!(path = %storage_path.display(), "opening storage");
        let store = Arc::new(FileStore::new(storage_path));
        let factory = Arc::new(HttpClientFactory::new(Duration::from_secs(
            config.request_timeout_secs,
        )));
        Self::with_parts(config, store, factory).await
    }

    pub async fn with_parts(
        config: PortalConfig,
        store: Arc<dyn KeyValueStore>,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self> {
        let provider = Arc::new(ChainProvider::new(store.clone(), factory));
        provider
            .initialize()
            .await
            .context("Failed to connect to the active chain")?;
        Ok(Self {
            config: Arc::new(config),
            store,
            provider,
            notices: NotificationCenter::new(),
        })
    }

    pub fn close(&self) {
        self.provider.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_chain::ChainDescriptor;
    use portal_chain::mock::MockFactory;
    use portal_core::MemoryStore;

    #[tokio::test]
    async fn active_chain_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let portal = Portal::with_parts(
            PortalConfig::default(),
            Arc::new(FileStore::new(&path)),
            Arc::new(MockFactory::new()),
        )
        .await
        .unwrap();
        assert!(portal.provider.switch_chain(ChainDescriptor::test()).await.unwrap());
        portal.close();

        let reopened = Portal::with_parts(
            PortalConfig::default(),
            Arc::new(FileStore::new(&path)),
            Arc::new(MockFactory::new()),
        )
        .await
        .unwrap();
        assert_eq!(reopened.provider.active_chain().unwrap(), ChainDescriptor::test());
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let factory = MockFactory::new();
        factory.fail_next("refused");
        let result = Portal::with_parts(
            PortalConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(factory),
        )
        .await;
        assert!(result.is_err());
    }
}
