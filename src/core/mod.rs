//! Core value types shared by the orchestration engine and the CLI.
//!
//! Everything here is created fresh per request and discarded once the
//! response has been returned.

pub mod intent;
pub mod outcome;
pub mod query;

pub use intent::{
    DRUG_AGENT, GENERAL_AGENT, GUIDELINE_AGENT, IntentResult, IntentType, RESEARCH_AGENT,
    VALID_AGENTS, is_valid_agent,
};
pub use outcome::{
    AgentOutcome, AgentReply, AgentSummary, Document, FinalResponse, OutcomeStatus,
};
pub use query::{Message, Query, Role, SubQuery};
