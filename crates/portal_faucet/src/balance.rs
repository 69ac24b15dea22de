//! Periodic gas balance polling.

use std::sync::Arc;
use std::time::Duration;

use portal_chain::{BalanceInfo, ChainProvider};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Polls `get_balance` for one owner and coin on a fixed interval and
/// publishes the latest value. The task stops when the watcher is dropped.
pub struct BalanceWatcher {
    latest: watch::Receiver<Option<BalanceInfo>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl BalanceWatcher {
    /// Must be called inside a tokio runtime. Each poll reads the provider's
    /// current client, so chain switches are picked up on the next tick.
    pub fn spawn(
        provider: Arc<ChainProvider>,
        owner: String,
        coin_type: String,
        interval: Duration,
    ) -> Self {
        let (tx, latest) = watch::channel(None);
        let refresh = Arc::new(Notify::new());
        let wake = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }
                let Some(client) = provider.client() else {
                    debug!("balance poll skipped, chain not ready");
                    continue;
                };
                match client.get_balance(&owner, &coin_type).await {
                    Ok(info) => {
                        tx.send_replace(Some(info));
                    }
                    Err(e) => warn!(%owner, %coin_type, error = %e, "balance poll failed"),
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Self {
            latest,
            refresh,
            task,
        }
    }

    /// Last balance seen, `None` until the first poll succeeds.
    pub fn latest(&self) -> Option<BalanceInfo> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<BalanceInfo>> {
        self.latest.clone()
    }

    /// Poll now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for BalanceWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
