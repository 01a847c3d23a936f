//! Google Gemini provider (Generative Language API, `generateContent`).
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - System instruction as a top-level field
//! - History as `user` / `model` contents, new turn appended last
//! - Per-category safety thresholds
//! - Blocks surfaced as [`Completion::Blocked`] with the raw feedback

use std::time::Duration;

use async_trait::async_trait;
use pinchat_core::error::ProviderError;
use pinchat_core::message::Turn;
use pinchat_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Harm categories sent with every request.
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Finish reasons that mean the candidate was withheld by policy.
const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// One setting per harm category, all at `threshold`.
pub fn safety_settings(threshold: &str) -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category: (*category).into(),
            threshold: threshold.into(),
        })
        .collect()
}

pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Point at a different endpoint (proxy, emulator).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    fn build_body(request: &ProviderRequest) -> GenerateRequest {
        let mut contents: Vec<Content> = request.history.iter().map(Content::from).collect();
        contents.push(Content {
            role: "user".into(),
            parts: vec![Part {
                text: request.user_text.clone(),
            }],
        });

        let system_instruction = (!request.system_instruction.is_empty()).then(|| SystemContent {
            parts: vec![Part {
                text: request.system_instruction.clone(),
            }],
        });

        GenerateRequest {
            system_instruction,
            contents,
            safety_settings: request
                .safety
                .iter()
                .map(|s| ApiSafetySetting {
                    category: s.category.clone(),
                    threshold: s.threshold.clone(),
                })
                .collect(),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        }
    }

    fn parse_response(
        api: GenerateResponse,
        requested_model: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let usage = api.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });
        let model = api
            .model_version
            .unwrap_or_else(|| requested_model.to_string());
        let respond = |completion| ProviderResponse {
            completion,
            model: model.clone(),
            usage: usage.clone(),
        };

        // Prompt rejected outright.
        if let Some(feedback) = &api.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Ok(respond(Completion::Blocked(BlockFeedback {
                    reason: Some(reason.clone()),
                    details: serde_json::to_value(feedback).unwrap_or_default(),
                })));
            }
        }

        let Some(candidate) = api.candidates.into_iter().next() else {
            return match api.prompt_feedback {
                Some(feedback) => Ok(respond(Completion::Blocked(BlockFeedback {
                    reason: None,
                    details: serde_json::to_value(&feedback).unwrap_or_default(),
                }))),
                None => Err(ProviderError::MalformedResponse(
                    "response has no candidates".into(),
                )),
            };
        };

        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
        {
            return Ok(respond(Completion::Blocked(BlockFeedback {
                reason: Some(reason.to_string()),
                details: serde_json::json!({ "safetyRatings": candidate.safety_ratings }),
            })));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(format!(
                "empty reply (finishReason: {})",
                candidate.finish_reason.as_deref().unwrap_or("none")
            )));
        }

        Ok(respond(Completion::Text(text)))
    }

    fn status_error(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(5),
            },
            401 | 403 => ProviderError::AuthenticationFailed("Invalid Gemini API key".into()),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = self.generate_url(&request.model);
        let body = Self::build_body(&request);

        debug!(
            provider = "gemini",
            model = %request.model,
            history = request.history.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(Self::status_error(status, retry_after, error_body));
        }

        let api_resp: GenerateResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        Self::parse_response(api_resp, &request.model)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemContent>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<ApiSafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().into(),
            parts: vec![Part {
                text: turn.text.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct ApiSafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    block_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    safety_ratings: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "gemini-2.0-flash-001".into(),
            system_instruction: "You are a helpful assistant.".into(),
            history: vec![Turn::user("Hi"), Turn::model("Hello!")],
            user_text: "Tell me a joke".into(),
            safety: safety_settings("BLOCK_MEDIUM_AND_ABOVE"),
            max_output_tokens: Some(2048),
            temperature: None,
        }
    }

    fn parse(json: serde_json::Value) -> Result<ProviderResponse, ProviderError> {
        let api: GenerateResponse = serde_json::from_value(json).unwrap();
        GeminiProvider::parse_response(api, "gemini-2.0-flash-001")
    }

    #[test]
    fn constructor_with_base_url() {
        let p = GeminiProvider::new("key", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(p.name(), "gemini");
        assert_eq!(
            p.generate_url("gemini-2.0-flash-001"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash-001:generateContent"
        );
    }

    #[test]
    fn safety_settings_cover_all_categories() {
        let settings = safety_settings("BLOCK_ONLY_HIGH");
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s.threshold == "BLOCK_ONLY_HIGH"));
        assert!(settings
            .iter()
            .any(|s| s.category == "HARM_CATEGORY_DANGEROUS_CONTENT"));
    }

    #[test]
    fn body_has_history_then_new_turn() {
        let body = serde_json::to_value(GeminiProvider::build_body(&request())).unwrap();

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "Tell me a joke");

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a helpful assistant."
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert!(body["generationConfig"].get("temperature").is_none());
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn empty_system_instruction_is_omitted() {
        let mut req = request();
        req.system_instruction.clear();
        let body = serde_json::to_value(GeminiProvider::build_body(&req)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn parse_text_response() {
        let resp = parse(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Why did " }, { "text": "the chicken..." }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17 },
            "modelVersion": "gemini-2.0-flash-001"
        }))
        .unwrap();

        assert_eq!(resp.completion, Completion::Text("Why did the chicken...".into()));
        assert_eq!(resp.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn prompt_block_reason_is_blocked() {
        let resp = parse(serde_json::json!({
            "promptFeedback": {
                "blockReason": "SAFETY",
                "safetyRatings": [{ "category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH" }]
            }
        }))
        .unwrap();

        match resp.completion {
            Completion::Blocked(feedback) => {
                assert_eq!(feedback.reason.as_deref(), Some("SAFETY"));
                assert_eq!(feedback.details["blockReason"], "SAFETY");
                assert_eq!(
                    feedback.details["safetyRatings"][0]["category"],
                    "HARM_CATEGORY_HARASSMENT"
                );
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn safety_finish_reason_is_blocked() {
        let resp = parse(serde_json::json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [{ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "MEDIUM" }]
            }]
        }))
        .unwrap();

        assert!(matches!(
            resp.completion,
            Completion::Blocked(BlockFeedback { reason: Some(ref r), .. }) if r == "SAFETY"
        ));
    }

    #[test]
    fn no_candidates_with_feedback_is_blocked() {
        let resp = parse(serde_json::json!({
            "candidates": [],
            "promptFeedback": { "safetyRatings": [] }
        }))
        .unwrap();
        assert!(matches!(resp.completion, Completion::Blocked(_)));
    }

    #[test]
    fn no_candidates_without_feedback_is_malformed() {
        let result = parse(serde_json::json!({ "candidates": [] }));
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn empty_text_is_an_error() {
        let result = parse(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [] }, "finishReason": "MAX_TOKENS" }]
        }));
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            GeminiProvider::status_error(429, Some(30), String::new()),
            ProviderError::RateLimited { retry_after_secs: 30 }
        ));
        assert!(matches!(
            GeminiProvider::status_error(403, None, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GeminiProvider::status_error(500, None, "boom".into()),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }
}
