//! Message domain types.
//!
//! A [`Message`] is one persisted side of an exchange: the user's turn or the
//! AI's reply. A [`Turn`] is the same content expressed in the vocabulary of
//! the external model (`user` / `model`), which is what the context assembler
//! produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::IdentityId;

/// Who authored a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The PIN holder
    User,
    /// The generative model
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "ai" => Ok(Sender::Ai),
            other => Err(format!("unknown sender tag '{other}'")),
        }
    }
}

/// A single stored message, scoped to one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// The identity this message belongs to
    pub identity: IdentityId,

    /// Who sent this message
    pub sender: Sender,

    /// The text content
    pub text: String,

    /// Server-assigned timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(identity: IdentityId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            identity,
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(identity: IdentityId, text: impl Into<String>) -> Self {
        Self::new(identity, Sender::User, text)
    }

    /// Create a new AI message.
    pub fn ai(identity: IdentityId, text: impl Into<String>) -> Self {
        Self::new(identity, Sender::Ai, text)
    }
}

/// Role of a turn as the external model names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl From<Sender> for TurnRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => TurnRole::User,
            Sender::Ai => TurnRole::Model,
        }
    }
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One entry of the conversation context sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

impl From<&Message> for Turn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.sender.into(),
            text: message.text.clone(),
        }
    }
}
