//! Store traits: the two durable collections the service persists.
//!
//! - [`PinStore`] holds provisioned PIN records (hash + creation time).
//! - [`MessageStore`] holds every user and AI turn, tagged by identity.
//!
//! There is deliberately no lookup-by-PIN: hashes are salted per record, so
//! the only way to resolve a PIN is to scan [`PinStore::all`].

use async_trait::async_trait;

use crate::error::StoreError;
use crate::identity::{IdentityId, PinRecord};
use crate::message::Message;

/// Durable collection of PIN records.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait PinStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// All records, in stored (insertion) order.
    async fn all(&self) -> Result<Vec<PinRecord>, StoreError>;

    /// Insert a new record. Fails with [`StoreError::Duplicate`] when the
    /// hash or id already exists.
    async fn insert(&self, record: PinRecord) -> Result<(), StoreError>;

    /// Number of provisioned records.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Durable, append-only collection of messages.
///
/// Ordering contract: messages of one identity are ordered by `timestamp`,
/// ties broken by insertion order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Persist a message as-is.
    async fn insert(&self, message: &Message) -> Result<(), StoreError>;

    /// Up to `limit` most recent messages of `identity`, newest first.
    async fn newest(&self, identity: &IdentityId, limit: usize)
    -> Result<Vec<Message>, StoreError>;

    /// Every message of `identity`, oldest first.
    async fn all_for(&self, identity: &IdentityId) -> Result<Vec<Message>, StoreError>;
}
