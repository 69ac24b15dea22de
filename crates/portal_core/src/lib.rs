pub mod config;
pub mod format;
pub mod generation;
pub mod logging;
pub mod notifications;
pub mod routes;
pub mod storage;

pub use config::{NetworkVariables, PortalConfig};
pub use format::{format_coin, parse_amount};
pub use generation::{GenerationTicket, RequestGeneration};
pub use notifications::{AppNotification, NotificationCenter, NotificationStore, NotificationType};
pub use routes::Page;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, keys};
