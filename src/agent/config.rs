//! Orchestrator configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::classifier::KEYWORD_CONFIDENCE;
use super::locale::Locale;
use super::retry::RetryConfig;
use crate::error::AgentError;

/// Default per-agent time budget in seconds.
const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 10;
/// Default classifier max tokens. The classifier only emits a small JSON object.
const DEFAULT_CLASSIFIER_MAX_TOKENS: u32 = 512;
/// Default composer max tokens.
const DEFAULT_COMPOSER_MAX_TOKENS: u32 = 4096;
/// Default max tokens for LLM-backed domain agents.
const DEFAULT_AGENT_MAX_TOKENS: u32 = 2048;
/// Confidence below which a classification is logged as a warning.
const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f32 = 0.6;
/// Default model for every LLM role.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the orchestration engine.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider. Without one, classification falls back to
    /// keyword routing and composition is skipped.
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for intent classification.
    pub classifier_model: String,
    /// Model for answer composition.
    pub composer_model: String,
    /// Model for LLM-backed domain agents.
    pub agent_model: String,
    /// Maximum tokens for classifier responses.
    pub classifier_max_tokens: u32,
    /// Maximum tokens for composer responses.
    pub composer_max_tokens: u32,
    /// Maximum tokens for LLM-backed domain agent responses.
    pub agent_max_tokens: u32,
    /// Default wall-clock budget for a single agent invocation.
    pub agent_timeout: Duration,
    /// Per-agent overrides of [`agent_timeout`](Self::agent_timeout).
    pub agent_timeouts: HashMap<String, Duration>,
    /// Backoff settings for every remote call.
    pub retry: RetryConfig,
    /// Whether multi-agent answers are composed into prose by the LLM.
    pub compose: bool,
    /// Confidence below which classification is logged as a warning.
    pub low_confidence_threshold: f32,
    /// Language of orchestrator-written text.
    pub locale: Locale,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing
    /// files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if a value fails validation.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            base_url: None,
            classifier_model: DEFAULT_MODEL.to_string(),
            composer_model: DEFAULT_MODEL.to_string(),
            agent_model: DEFAULT_MODEL.to_string(),
            classifier_max_tokens: DEFAULT_CLASSIFIER_MAX_TOKENS,
            composer_max_tokens: DEFAULT_COMPOSER_MAX_TOKENS,
            agent_max_tokens: DEFAULT_AGENT_MAX_TOKENS,
            agent_timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
            agent_timeouts: HashMap::new(),
            retry: RetryConfig::default(),
            compose: true,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            locale: Locale::default(),
            prompt_dir: None,
        }
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    classifier_model: Option<String>,
    composer_model: Option<String>,
    agent_model: Option<String>,
    classifier_max_tokens: Option<u32>,
    composer_max_tokens: Option<u32>,
    agent_max_tokens: Option<u32>,
    agent_timeout: Option<Duration>,
    agent_timeouts: HashMap<String, Duration>,
    retry: Option<RetryConfig>,
    max_retries: Option<u32>,
    compose: Option<bool>,
    low_confidence_threshold: Option<f32>,
    locale: Option<Locale>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("MEDROUTE_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("MEDROUTE_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("MEDROUTE_BASE_URL"))
                .ok();
        }
        if self.classifier_model.is_none() {
            self.classifier_model = std::env::var("MEDROUTE_CLASSIFIER_MODEL").ok();
        }
        if self.composer_model.is_none() {
            self.composer_model = std::env::var("MEDROUTE_COMPOSER_MODEL").ok();
        }
        if self.agent_model.is_none() {
            self.agent_model = std::env::var("MEDROUTE_AGENT_MODEL").ok();
        }
        if self.agent_timeout.is_none() {
            self.agent_timeout = std::env::var("MEDROUTE_AGENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        }
        if self.max_retries.is_none() {
            self.max_retries = std::env::var("MEDROUTE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.locale.is_none() {
            self.locale = std::env::var("MEDROUTE_LOCALE")
                .ok()
                .and_then(|v| Locale::parse(&v));
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("MEDROUTE_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the classifier model.
    #[must_use]
    pub fn classifier_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = Some(model.into());
        self
    }

    /// Sets the composer model.
    #[must_use]
    pub fn composer_model(mut self, model: impl Into<String>) -> Self {
        self.composer_model = Some(model.into());
        self
    }

    /// Sets the model for LLM-backed domain agents.
    #[must_use]
    pub fn agent_model(mut self, model: impl Into<String>) -> Self {
        self.agent_model = Some(model.into());
        self
    }

    /// Sets the classifier max tokens.
    #[must_use]
    pub const fn classifier_max_tokens(mut self, n: u32) -> Self {
        self.classifier_max_tokens = Some(n);
        self
    }

    /// Sets the composer max tokens.
    #[must_use]
    pub const fn composer_max_tokens(mut self, n: u32) -> Self {
        self.composer_max_tokens = Some(n);
        self
    }

    /// Sets the domain agent max tokens.
    #[must_use]
    pub const fn agent_max_tokens(mut self, n: u32) -> Self {
        self.agent_max_tokens = Some(n);
        self
    }

    /// Sets the default per-agent time budget.
    #[must_use]
    pub const fn agent_timeout(mut self, duration: Duration) -> Self {
        self.agent_timeout = Some(duration);
        self
    }

    /// Overrides the time budget of one agent.
    #[must_use]
    pub fn agent_timeout_for(mut self, agent: impl Into<String>, duration: Duration) -> Self {
        self.agent_timeouts.insert(agent.into(), duration);
        self
    }

    /// Sets the full retry configuration.
    #[must_use]
    pub const fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the retry count, keeping the other backoff settings.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Enables or disables LLM composition of multi-agent answers.
    #[must_use]
    pub const fn compose(mut self, enabled: bool) -> Self {
        self.compose = Some(enabled);
        self
    }

    /// Sets the low-confidence warning threshold.
    #[must_use]
    pub const fn low_confidence_threshold(mut self, threshold: f32) -> Self {
        self.low_confidence_threshold = Some(threshold);
        self
    }

    /// Sets the locale.
    #[must_use]
    pub const fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] for a zero timeout or a
    /// threshold outside `(0.5, 1]`. Keyword-fallback classifications score
    /// 0.5 and must stay below the threshold.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let defaults = AgentConfig::default();

        let agent_timeout = self.agent_timeout.unwrap_or(defaults.agent_timeout);
        if agent_timeout.is_zero() || self.agent_timeouts.values().any(Duration::is_zero) {
            return Err(AgentError::InvalidConfig {
                message: "agent timeouts must be greater than zero".to_string(),
            });
        }

        let low_confidence_threshold = self
            .low_confidence_threshold
            .unwrap_or(defaults.low_confidence_threshold);
        if low_confidence_threshold.is_nan()
            || low_confidence_threshold <= KEYWORD_CONFIDENCE
            || low_confidence_threshold > 1.0
        {
            return Err(AgentError::InvalidConfig {
                message: format!(
                    "low confidence threshold must be in ({KEYWORD_CONFIDENCE}, 1], got {low_confidence_threshold}"
                ),
            });
        }

        let mut retry = self.retry.unwrap_or(defaults.retry);
        if let Some(n) = self.max_retries {
            retry = retry.with_max_attempts(n);
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or(defaults.provider),
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            base_url: self.base_url,
            classifier_model: self.classifier_model.unwrap_or(defaults.classifier_model),
            composer_model: self.composer_model.unwrap_or(defaults.composer_model),
            agent_model: self.agent_model.unwrap_or(defaults.agent_model),
            classifier_max_tokens: self
                .classifier_max_tokens
                .unwrap_or(defaults.classifier_max_tokens),
            composer_max_tokens: self
                .composer_max_tokens
                .unwrap_or(defaults.composer_max_tokens),
            agent_max_tokens: self.agent_max_tokens.unwrap_or(defaults.agent_max_tokens),
            agent_timeout,
            agent_timeouts: self.agent_timeouts,
            retry,
            compose: self.compose.unwrap_or(defaults.compose),
            low_confidence_threshold,
            locale: self.locale.unwrap_or(defaults.locale),
            prompt_dir: self.prompt_dir,
        })
    }
}
