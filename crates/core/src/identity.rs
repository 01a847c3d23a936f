//! Identity types: the opaque reference a PIN resolves to.
//!
//! An identity is the unit to which sessions and messages are scoped. There
//! are no usernames: the only credential is the PIN, and the stored record
//! carries nothing but its salted one-way hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a provisioned PIN record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A provisioned PIN record.
///
/// `pin_hash` is a self-describing hash string (algorithm, cost parameters
/// and salt are encoded in it). Hashes are unique across records.
#[derive(Clone, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: IdentityId,
    pub pin_hash: String,
    pub created_at: DateTime<Utc>,
}

impl PinRecord {
    /// Create a fresh record for an already-hashed PIN.
    pub fn new(pin_hash: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(),
            pin_hash: pin_hash.into(),
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for PinRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinRecord")
            .field("id", &self.id)
            .field("pin_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}
