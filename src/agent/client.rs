//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`,
///   available with the `openai` feature
///
/// # Errors
///
/// Returns [`AgentError::ApiKeyMissing`] when no key is configured and
/// [`AgentError::UnsupportedProvider`] for unknown or disabled providers.
#[cfg_attr(not(feature = "openai"), allow(unused_variables))]
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let Some(api_key) = config.api_key.as_deref() else {
        return Err(AgentError::ApiKeyMissing);
    };
    match config.provider.as_str() {
        #[cfg(feature = "openai")]
        "openai" => Ok(Arc::new(crate::agent::providers::OpenAiProvider::new(
            api_key,
            config.base_url.as_deref(),
        ))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "openai")]
    #[test]
    fn test_create_openai_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap_or_else(|_| unreachable!()).name(), "openai");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("unknown")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let result = create_provider(&config);
        assert!(matches!(result, Err(AgentError::UnsupportedProvider { .. })));
    }

    #[test]
    fn test_missing_api_key() {
        let config = AgentConfig::builder()
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            create_provider(&config),
            Err(AgentError::ApiKeyMissing)
        ));
    }
}
