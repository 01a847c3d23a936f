//! Scripted provider for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use pinchat_core::error::ProviderError;
use pinchat_core::provider::{
    BlockFeedback, Completion, Provider, ProviderRequest, ProviderResponse, Usage,
};

/// Answers each `complete` call with the next scripted outcome and records
/// every request it receives. Once the script runs out, calls fail with a
/// 500-style [`ProviderError::ApiError`].
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// One reply per entry.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(text_response(t))).collect())
    }

    pub fn blocked(reason: &str) -> Self {
        Self::new(vec![Ok(blocked_response(reason))])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        lock(&self.requests).push(request);
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "scripted provider has no more responses".into(),
                })
            })
    }
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        completion: Completion::Text(text.into()),
        model: "scripted-model".into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

pub fn blocked_response(reason: &str) -> ProviderResponse {
    ProviderResponse {
        completion: Completion::Blocked(BlockFeedback {
            reason: Some(reason.into()),
            details: serde_json::json!({
                "blockReason": reason,
                "safetyRatings": [{ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "HIGH" }]
            }),
        }),
        model: "scripted-model".into(),
        usage: None,
    }
}
