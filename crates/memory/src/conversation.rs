//! Conversation accessor over a [`MessageStore`].
//!
//! Validates and stamps new messages, and reads history back in the two
//! shapes callers need: a bounded recent window for model context and the
//! full transcript shown after login.

use std::sync::Arc;

use pinchat_core::error::Error;
use pinchat_core::identity::IdentityId;
use pinchat_core::message::{Message, Sender};
use pinchat_core::store::MessageStore;
use tracing::debug;

#[derive(Clone)]
pub struct Conversations {
    store: Arc<dyn MessageStore>,
}

impl Conversations {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Persist a message. Text is trimmed; whitespace-only text is rejected
    /// with [`Error::EmptyMessage`] and nothing is written.
    pub async fn append(
        &self,
        identity: &IdentityId,
        sender: Sender,
        text: &str,
    ) -> Result<Message, Error> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let message = Message::new(identity.clone(), sender, text);
        self.store.insert(&message).await?;
        debug!(identity = %identity, sender = %sender, id = %message.id, "Appended message");
        Ok(message)
    }

    /// Up to `limit` most recent messages, oldest first.
    pub async fn recent_window(
        &self,
        identity: &IdentityId,
        limit: usize,
    ) -> Result<Vec<Message>, Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut window = self.store.newest(identity, limit).await?;
        window.reverse();
        Ok(window)
    }

    /// Every message of `identity`, oldest first.
    pub async fn full_history(&self, identity: &IdentityId) -> Result<Vec<Message>, Error> {
        Ok(self.store.all_for(identity).await?)
    }
}
