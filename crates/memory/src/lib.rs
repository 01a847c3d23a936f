//! Durable storage for PinChat: PIN records and conversation history.

pub mod conversation;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use pinchat_config::DatabaseConfig;
use pinchat_core::error::StoreError;
use pinchat_core::store::{MessageStore, PinStore};
use tracing::info;

pub use conversation::Conversations;
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// The two store handles the service runs on. Both usually point at the
/// same backend instance.
#[derive(Clone)]
pub struct Stores {
    pub pins: Arc<dyn PinStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Stores {
    /// Share one backend for both collections.
    pub fn shared<S>(backend: Arc<S>) -> Self
    where
        S: PinStore + MessageStore + 'static,
    {
        Self {
            pins: backend.clone(),
            messages: backend,
        }
    }
}

/// Open the backend named in `config.backend`.
pub async fn open(config: &DatabaseConfig) -> Result<Stores, StoreError> {
    let stores = match config.backend.as_str() {
        "in_memory" => Stores::shared(Arc::new(InMemoryStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Stores::shared(Arc::new(
            SqliteStore::new(&config.url, config.max_connections).await?,
        )),
        other => {
            return Err(StoreError::Storage(format!(
                "Unsupported database backend '{other}'"
            )));
        }
    };

    info!(backend = %config.backend, "Store ready");
    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory() {
        let config = DatabaseConfig {
            backend: "in_memory".into(),
            ..DatabaseConfig::default()
        };
        let stores = open(&config).await.unwrap();
        assert_eq!(stores.pins.name(), "in_memory");
        assert_eq!(stores.messages.name(), "in_memory");
    }

    #[tokio::test]
    async fn open_sqlite_memory_url() {
        let config = DatabaseConfig {
            backend: "sqlite".into(),
            url: "sqlite::memory:".into(),
            max_connections: 4,
        };
        let stores = open(&config).await.unwrap();
        assert_eq!(stores.pins.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_backend_is_an_error() {
        let config = DatabaseConfig {
            backend: "mongodb".into(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(open(&config).await, Err(StoreError::Storage(_))));
    }
}
