//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls, so the classifier, composer and
//! LLM-backed agents never touch a vendor SDK directly.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// A chat-completion backend.
///
/// Implementations handle the transport for a specific provider and map
/// its failures onto [`AgentError`] with an HTTP status where one is known,
/// so the retry layer can tell transient failures from permanent ones.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Sends one completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] for transport and API failures and
    /// [`AgentError::ResponseParse`] when the reply cannot be decoded.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}
