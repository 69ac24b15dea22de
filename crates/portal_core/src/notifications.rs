use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-facing notice (the portal's toast).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppNotification {
    pub id: String,
    pub notification_type: NotificationType,
    pub message: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

impl AppNotification {
    pub fn new(notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            notification_type,
            message: message.into(),
            read: false,
            timestamp: Utc::now(),
        }
    }
}

/// In-memory notification store, newest first.
pub struct NotificationStore {
    notifications: Vec<AppNotification>,
    max_notifications: usize,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            notifications: Vec::new(),
            max_notifications: 100,
        }
    }

    pub fn push(&mut self, notification: AppNotification) {
        self.notifications.insert(0, notification);
        if self.notifications.len() > self.max_notifications {
            self.notifications.truncate(self.max_notifications);
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.read = true;
        }
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn all(&self) -> &[AppNotification] {
        &self.notifications
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle over a shared [`NotificationStore`].
///
/// Every notice is also logged, so headless runs still surface failures.
#[derive(Clone, Default)]
pub struct NotificationCenter {
    store: Arc<Mutex<NotificationStore>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "notice");
        self.push(NotificationType::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "notice");
        self.push(NotificationType::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "notice");
        self.push(NotificationType::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "notice");
        self.push(NotificationType::Error, message);
    }

    fn push(&self, kind: NotificationType, message: String) {
        self.store.lock().push(AppNotification::new(kind, message));
    }

    /// Snapshot of all notices, newest first.
    pub fn snapshot(&self) -> Vec<AppNotification> {
        self.store.lock().all().to_vec()
    }

    /// Most recent notice, if any.
    pub fn latest(&self) -> Option<AppNotification> {
        self.store.lock().all().first().cloned()
    }

    /// Return the unread notices and mark them read. They stay in the store.
    pub fn drain_unread(&self) -> Vec<AppNotification> {
        let mut store = self.store.lock();
        let unread: Vec<_> = store.all().iter().filter(|n| !n.read).cloned().collect();
        store.mark_all_read();
        unread
    }

    pub fn unread_count(&self) -> usize {
        self.store.lock().unread_count()
    }
}
