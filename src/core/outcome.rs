//! Per-agent outcomes, retrieved documents and the final response.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::intent::IntentResult;

/// A document retrieved by an agent. Provenance fields are opaque to the
/// orchestrator; they are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Backing source (e.g. `"drugbank"`, `"pubmed"`).
    pub source: String,
    /// Stable identifier within the source.
    pub id: String,
    /// Link to the original, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Retrieved content or excerpt.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
}

impl Document {
    /// Creates a document with only its identity set.
    #[must_use]
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            url: None,
            title: None,
            content: String::new(),
        }
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// What a domain agent returns on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    /// Answer text, possibly with `[n]` markers and a reference block.
    pub response_text: String,
    /// Documents backing the answer.
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl AgentReply {
    /// Creates a reply without documents.
    #[must_use]
    pub fn text(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            documents: Vec::new(),
        }
    }
}

/// How an agent invocation ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The agent answered.
    #[default]
    Ok,
    /// The agent exceeded its time budget.
    TimedOut,
    /// The agent errored or panicked.
    Failed,
}

impl OutcomeStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one agent invocation. Degraded outcomes are still well-formed:
/// they carry a user-facing message and no documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Agent name.
    pub agent: String,
    /// Answer text, or the degraded-service message.
    pub response_text: String,
    /// Documents retrieved by the agent.
    #[serde(default)]
    pub documents: Vec<Document>,
    /// How the invocation ended.
    #[serde(default)]
    pub status: OutcomeStatus,
    /// Error detail when not ok.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time spent in the invocation.
    #[serde(default, with = "duration_secs")]
    pub elapsed: Duration,
}

impl AgentOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn ok(agent: impl Into<String>, reply: AgentReply, elapsed: Duration) -> Self {
        Self {
            agent: agent.into(),
            response_text: reply.response_text,
            documents: reply.documents,
            status: OutcomeStatus::Ok,
            error: None,
            elapsed,
        }
    }

    /// A timed-out outcome.
    #[must_use]
    pub fn timed_out(agent: impl Into<String>, message: String, elapsed: Duration) -> Self {
        Self {
            agent: agent.into(),
            response_text: message,
            documents: Vec::new(),
            status: OutcomeStatus::TimedOut,
            error: Some(format!("timed out after {:.1}s", elapsed.as_secs_f64())),
            elapsed,
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn failed(
        agent: impl Into<String>,
        message: String,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            agent: agent.into(),
            response_text: message,
            documents: Vec::new(),
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
            elapsed,
        }
    }

    /// Returns `true` if the agent answered.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }
}

/// Per-agent line in the final response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    /// Agent name.
    pub agent: String,
    /// How the invocation ended.
    pub status: OutcomeStatus,
    /// Error detail when not ok.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Documents contributed.
    pub documents: usize,
    /// Wall time spent.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl From<&AgentOutcome> for AgentSummary {
    fn from(outcome: &AgentOutcome) -> Self {
        Self {
            agent: outcome.agent.clone(),
            status: outcome.status,
            error: outcome.error.clone(),
            documents: outcome.documents.len(),
            elapsed: outcome.elapsed,
        }
    }
}

/// The merged answer returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct FinalResponse {
    /// Answer text with globally numbered citations and the reference block.
    pub text: String,
    /// Combined reference list; entry `i` is cited as `[i + 1]`.
    pub references: Vec<String>,
    /// All documents: earlier turns first, then this turn's in agent order.
    pub documents: Vec<Document>,
    /// The routing decision.
    pub intent: IntentResult,
    /// One entry per invoked agent, in invocation order.
    pub agents: Vec<AgentSummary>,
    /// Total wall time.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl FinalResponse {
    /// Agents that did not answer.
    pub fn degraded_agents(&self) -> impl Iterator<Item = &AgentSummary> {
        self.agents
            .iter()
            .filter(|a| a.status != OutcomeStatus::Ok)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(d)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_deserialization_defaults() {
        let json = r#"{"agent": "drug_agent", "response_text": "Take 400 mg [1]"}"#;
        let outcome: AgentOutcome = serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        assert!(outcome.is_ok());
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_degraded_outcomes_have_no_documents() {
        let timed_out = AgentOutcome::timed_out("research_agent", "slow".to_string(), Duration::from_secs(10));
        assert_eq!(timed_out.status, OutcomeStatus::TimedOut);
        assert!(timed_out.documents.is_empty());
        assert!(timed_out.error.is_some());

        let failed = AgentOutcome::failed("drug_agent", "down".to_string(), "503", Duration::ZERO);
        assert_eq!(failed.status, OutcomeStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("503"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&OutcomeStatus::TimedOut).unwrap_or_default();
        assert_eq!(json, "\"timed_out\"");
    }

    #[test]
    fn test_document_skips_empty_fields() {
        let doc = Document::new("pubmed", "PMID:1").with_url("https://pubmed.example/1");
        let json = serde_json::to_string(&doc).unwrap_or_default();
        assert!(json.contains("\"url\""));
        assert!(!json.contains("title"));
        assert!(!json.contains("content"));
    }
}
