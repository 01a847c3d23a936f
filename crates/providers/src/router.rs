//! Provider selection from configuration.

use std::sync::Arc;
use std::time::Duration;

use pinchat_config::ModelConfig;
use pinchat_core::error::ProviderError;
use pinchat_core::provider::Provider;
use tracing::info;

use crate::gemini::GeminiProvider;

/// Build the provider named in `config.provider`.
pub fn build_from_config(config: &ModelConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    ProviderError::NotConfigured("model.api_key (GEMINI_API_KEY) is not set".into())
                })?;

            let mut provider =
                GeminiProvider::new(api_key, Duration::from_secs(config.timeout_secs))?;
            if let Some(url) = &config.api_url {
                provider = provider.with_base_url(url);
            }

            info!(provider = "gemini", model = %config.model, "Model provider ready");
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::NotConfigured(format!(
            "Unknown model provider '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_requires_api_key() {
        let config = ModelConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn gemini_with_key_builds() {
        let config = ModelConfig {
            api_key: Some("test-key".into()),
            api_url: Some("http://localhost:9999".into()),
            ..ModelConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = ModelConfig {
            provider: "openai".into(),
            api_key: Some("k".into()),
            ..ModelConfig::default()
        };
        assert!(build_from_config(&config).is_err());
    }
}
