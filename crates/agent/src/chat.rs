//! The send-message pipeline.
//!
//! One call to [`ChatAgent::reply`] runs, as sequential awaits:
//!
//! 1. **Persist** the user turn (rejects empty text before any write)
//! 2. **Fetch** the recent window for the identity
//! 3. **Assemble** history + new turn
//! 4. **Call** the provider once, no retries
//! 5. **Persist** the AI turn, unless the provider blocked the request
//!
//! A failure after step 1 leaves the user turn stored without a reply.

use std::sync::Arc;

use pinchat_config::AppConfig;
use pinchat_core::error::{Error, ProviderError};
use pinchat_core::identity::IdentityId;
use pinchat_core::message::Sender;
use pinchat_core::provider::{Completion, Provider, ProviderRequest, SafetySetting};
use pinchat_memory::Conversations;
use tracing::{debug, info, warn};

use crate::context::ContextAssembler;
use crate::persona::Persona;

pub struct ChatAgent {
    conversations: Conversations,
    provider: Arc<dyn Provider>,
    assembler: ContextAssembler,
    persona: Persona,
    model: String,
    window: usize,
    safety: Vec<SafetySetting>,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl ChatAgent {
    pub fn new(
        conversations: Conversations,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        let assembler = ContextAssembler::default();
        Self {
            conversations,
            provider,
            window: assembler.max_messages(),
            assembler,
            persona: Persona::default(),
            model: model.into(),
            safety: Vec::new(),
            max_output_tokens: None,
            temperature: None,
        }
    }

    /// Wire an agent from the `model` and `chat` config sections.
    pub fn from_config(
        config: &AppConfig,
        conversations: Conversations,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self::new(conversations, provider, &config.model.model)
            .with_window(config.chat.history_window)
            .with_persona(Persona::from_config(&config.chat))
            .with_safety(pinchat_providers::safety_settings(
                &config.model.safety_threshold,
            ))
            .with_max_output_tokens(config.model.max_output_tokens)
            .with_temperature(config.model.temperature)
    }

    /// Number of stored messages fetched per call, and the bound on
    /// history + current turn.
    pub fn with_window(mut self, window: usize) -> Self {
        self.assembler = ContextAssembler::new(window);
        self.window = self.assembler.max_messages();
        self
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_safety(mut self, safety: Vec<SafetySetting>) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    /// Run one user turn and return the stored reply text.
    ///
    /// Errors: [`Error::EmptyMessage`] (nothing stored),
    /// [`Error::Blocked`] (user turn stored, no reply stored), and store or
    /// provider failures.
    pub async fn reply(&self, identity: &IdentityId, text: &str) -> Result<String, Error> {
        let user_msg = self
            .conversations
            .append(identity, Sender::User, text)
            .await?;

        let window = self
            .conversations
            .recent_window(identity, self.window)
            .await?;
        let context = self.assembler.assemble(&window, &user_msg);
        debug!(
            identity = %identity,
            window = context.metadata.window_size,
            history = context.metadata.history_included,
            drops = ?context.metadata.drops,
            "Assembled context"
        );

        let request = ProviderRequest {
            model: self.model.clone(),
            system_instruction: self.persona.instruction().to_string(),
            history: context.history,
            user_text: context.user_text,
            safety: self.safety.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        };

        let response = self.provider.complete(request).await?;

        match response.completion {
            Completion::Text(reply) => {
                if reply.trim().is_empty() {
                    return Err(ProviderError::MalformedResponse("empty reply".into()).into());
                }
                let ai_msg = self
                    .conversations
                    .append(identity, Sender::Ai, &reply)
                    .await?;
                info!(
                    identity = %identity,
                    model = %response.model,
                    tokens = response.usage.map(|u| u.total_tokens),
                    "Reply stored"
                );
                Ok(ai_msg.text)
            }
            Completion::Blocked(feedback) => {
                warn!(identity = %identity, reason = %feedback, "Provider blocked the turn");
                Err(Error::Blocked(feedback))
            }
        }
    }
}
