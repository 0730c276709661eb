//! The incoming request: user text, optional structured sub-query and
//! conversation history.
//!
//! Wire formats are converted into these types once, at ingress. The
//! orchestrator never inspects raw JSON shapes.

use serde::{Deserialize, Serialize};

use super::outcome::Document;

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    #[serde(alias = "human")]
    User,
    /// The assistant.
    #[serde(alias = "ai")]
    Assistant,
    /// System instructions.
    System,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who said it. Accepts `role` or `type` on the wire.
    #[serde(alias = "type")]
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl Message {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A structured sub-query set by the caller ahead of routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubQuery {
    /// Lookup of a specific drug.
    Drug {
        /// Drug name (generic or brand).
        drug_name: String,
        /// What to look up (dosage, interactions, ...), if narrowed.
        #[serde(default)]
        aspect: Option<String>,
    },
    /// Literature search.
    Research {
        /// Search terms.
        terms: String,
        /// Maximum number of articles to retrieve.
        #[serde(default)]
        max_results: Option<usize>,
    },
    /// Clinical guideline search.
    Guideline {
        /// Clinical topic.
        topic: String,
        /// Issuing body or specialty filter.
        #[serde(default)]
        specialty: Option<String>,
    },
}

/// A user query as seen by the orchestrator. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Raw user text.
    pub text: String,
    /// Pre-set structured sub-query, bypassing classification.
    #[serde(default)]
    pub sub_query: Option<SubQuery>,
    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
    /// Documents retrieved in earlier turns of the same conversation.
    #[serde(default)]
    pub prior_documents: Vec<Document>,
}

impl Query {
    /// Creates a query from raw user text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches conversation history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Attaches a structured sub-query.
    #[must_use]
    pub fn with_sub_query(mut self, sub_query: SubQuery) -> Self {
        self.sub_query = Some(sub_query);
        self
    }

    /// Attaches documents accumulated in earlier turns.
    #[must_use]
    pub fn with_prior_documents(mut self, documents: Vec<Document>) -> Self {
        self.prior_documents = documents;
        self
    }
}
