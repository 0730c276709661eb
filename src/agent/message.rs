//! Chat types shared by every LLM role.
//!
//! The classifier, the composer and the LLM-backed agents build these; only
//! the provider implementation converts them to a vendor SDK.

use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// One message of a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: ChatRole,
    /// Text.
    pub content: String,
}

/// One completion request: a system prompt plus the built user prompt.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Messages, system prompt first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Completion token cap.
    pub max_tokens: Option<u32>,
    /// Ask for a JSON object (used by the classifier).
    pub json_mode: bool,
}

/// Tokens billed for one completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// The completion returned by a provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
    /// Billing counters.
    pub usage: TokenUsage,
    /// Finish reason from the model (e.g., `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: ChatRole::System,
        content: content.to_string(),
    }
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: ChatRole::User,
        content: content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = system_message("You triage medical questions.");
        assert_eq!(msg.role, ChatRole::System);
        assert_eq!(msg.content, "You triage medical questions.");

        let msg = user_message("¿Dosis de ibuprofeno?");
        assert_eq!(msg.role, ChatRole::User);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap_or_default();
        assert_eq!(json, "\"assistant\"");
    }
}
