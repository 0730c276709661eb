//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::Synthesis;
use crate::core::{FinalResponse, IntentResult, OutcomeStatus};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON, with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}\n"))
    }
}

/// Formats a routing decision.
#[must_use]
pub fn format_intent(intent: &IntentResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let agents = if intent.agents_to_call().is_empty() {
                "(none)".to_string()
            } else {
                intent.agents_to_call().join(", ")
            };
            format!(
                "Intent:     {}\nConfidence: {:.2}\nAgents:     {agents}\nReasoning:  {}\n",
                intent.intent(),
                intent.confidence(),
                intent.reasoning()
            )
        }
        OutputFormat::Json => format.to_json(intent),
    }
}

/// Formats a full answer with its per-agent summary.
#[must_use]
pub fn format_response(response: &FinalResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = response.text.trim_end().to_string();
            output.push_str("\n\n---\n");
            let _ = writeln!(
                output,
                "intent: {} ({:.2})  elapsed: {:.1}s",
                response.intent.intent(),
                response.intent.confidence(),
                response.elapsed.as_secs_f64()
            );
            for agent in &response.agents {
                let _ = write!(
                    output,
                    "  {:<16} {:<9} {:>5.1}s  {} doc(s)",
                    agent.agent,
                    agent.status.as_str(),
                    agent.elapsed.as_secs_f64(),
                    agent.documents
                );
                if agent.status != OutcomeStatus::Ok
                    && let Some(error) = &agent.error
                {
                    let _ = write!(output, "  [{error}]");
                }
                output.push('\n');
            }
            output
        }
        OutputFormat::Json => format.to_json(response),
    }
}

/// Formats an offline synthesis.
#[must_use]
pub fn format_synthesis(synthesis: &Synthesis, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = synthesis.text.clone();
            if !output.ends_with('\n') {
                output.push('\n');
            }
            output
        }
        OutputFormat::Json => format.to_json(synthesis),
    }
}
