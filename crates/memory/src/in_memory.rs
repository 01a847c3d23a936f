//! In-memory store, useful for testing and throwaway deployments.

use std::sync::Arc;

use async_trait::async_trait;
use pinchat_core::error::StoreError;
use pinchat_core::identity::{IdentityId, PinRecord};
use pinchat_core::message::Message;
use pinchat_core::store::{MessageStore, PinStore};
use tokio::sync::RwLock;

/// Keeps PIN records and messages in insertion-ordered `Vec`s.
/// Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    pins: Arc<RwLock<Vec<PinRecord>>>,
    messages: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of `identity` in chronological order. The sort is stable,
    /// so equal timestamps keep insertion order.
    async fn ordered(&self, identity: &IdentityId) -> Vec<Message> {
        let mut owned: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| &m.identity == identity)
            .cloned()
            .collect();
        owned.sort_by_key(|m| m.timestamp);
        owned
    }
}

#[async_trait]
impl PinStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn all(&self) -> Result<Vec<PinRecord>, StoreError> {
        Ok(self.pins.read().await.clone())
    }

    async fn insert(&self, record: PinRecord) -> Result<(), StoreError> {
        let mut pins = self.pins.write().await;
        if pins
            .iter()
            .any(|p| p.id == record.id || p.pin_hash == record.pin_hash)
        {
            return Err(StoreError::Duplicate("PIN record already exists".into()));
        }
        pins.push(record);
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.pins.read().await.len())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::Duplicate("message already exists".into()));
        }
        messages.push(message.clone());
        Ok(())
    }

    async fn newest(
        &self,
        identity: &IdentityId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let mut ordered = self.ordered(identity).await;
        ordered.reverse();
        ordered.truncate(limit);
        Ok(ordered)
    }

    async fn all_for(&self, identity: &IdentityId) -> Result<Vec<Message>, StoreError> {
        Ok(self.ordered(identity).await)
    }
}
