//! Provider trait: the abstraction over the external generative service.
//!
//! A Provider receives a system instruction, an ordered history of turns and
//! the new user text, and answers either with reply text or with a block
//! signal carrying the service's safety feedback.
//!
//! Implementations: Gemini (`pinchat-providers`), scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Turn;

/// A harm category threshold forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    /// Provider harm category (e.g., "HARM_CATEGORY_HARASSMENT")
    pub category: String,

    /// Provider block threshold (e.g., "BLOCK_MEDIUM_AND_ABOVE")
    pub threshold: String,
}

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gemini-2.0-flash-001")
    pub model: String,

    /// Fixed persona / policy text
    pub system_instruction: String,

    /// Prior turns, oldest first. Never contains `user_text`.
    pub history: Vec<Turn>,

    /// The new user turn
    pub user_text: String,

    /// Safety thresholds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety: Vec<SafetySetting>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Sampling temperature; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Structured refusal returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFeedback {
    /// Short reason code (e.g., "SAFETY")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Raw provider feedback (safety ratings etc.)
    #[serde(default)]
    pub details: serde_json::Value,
}

impl std::fmt::Display for BlockFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason.as_deref().unwrap_or("unspecified"))
    }
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Reply text
    Text(String),
    /// The turn was refused by the provider's content policy
    Blocked(BlockFeedback),
}

/// A complete response from a provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub completion: Completion,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The chat pipeline calls `complete()` without knowing which service is
/// behind it. One call per user turn; no retries.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
