//! LLM agent trait definition.
//!
//! The classifier, the composer and the LLM-backed domain agents implement
//! this trait, which gives each a fixed system prompt and model settings.

use async_trait::async_trait;
use tracing::debug;

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use super::retry::RetryExecutor;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by every LLM-backed role in the system.
///
/// The role name is only used for logging; the name a domain agent is
/// registered under lives on [`DomainAgent`](super::domain::DomainAgent).
#[async_trait]
pub trait Agent: Send + Sync {
    /// Role name for logging and identification.
    fn role(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent once with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or response parsing errors.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
        };

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent, retrying transient provider failures.
///
/// # Errors
///
/// Returns the last [`AgentError`] once retries are exhausted, or the first
/// non-transient one.
pub async fn execute_with_retry(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
    retry: &RetryExecutor,
) -> Result<AgentResponse, AgentError> {
    let response = retry
        .execute(|| agent.execute(provider, user_msg))
        .await?;
    debug!(
        role = agent.role(),
        model = agent.model(),
        total_tokens = response.usage.total_tokens,
        finish_reason = ?response.finish_reason,
        "agent call complete"
    );
    Ok(response)
}
