//! Intent categories and the classification result.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Drug information agent (pharmaceutical database lookups).
pub const DRUG_AGENT: &str = "drug_agent";
/// Literature research agent.
pub const RESEARCH_AGENT: &str = "research_agent";
/// Clinical guideline agent.
pub const GUIDELINE_AGENT: &str = "guideline_agent";
/// General-purpose medical agent, the routing fallback.
pub const GENERAL_AGENT: &str = "general_agent";

/// Agents the router may select. Anything else is dropped.
pub const VALID_AGENTS: [&str; 4] = [DRUG_AGENT, RESEARCH_AGENT, GUIDELINE_AGENT, GENERAL_AGENT];

/// Returns `true` if `name` is a whitelisted agent.
#[must_use]
pub fn is_valid_agent(name: &str) -> bool {
    VALID_AGENTS.contains(&name)
}

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    /// Dosage, interactions, adverse effects of a drug.
    DrugInfo,
    /// What a clinical guideline recommends.
    GuidelineLookup,
    /// What the literature says.
    ResearchQuery,
    /// Drug question that also needs published evidence.
    CompoundQuery,
    /// Patient-level clinical question spanning several sources.
    ClinicalQuestion,
    /// Time-critical diagnostic question.
    UrgentDiagnostic,
    /// Medical but not tied to a specialised source.
    GeneralMedical,
    /// Not a medical question.
    OutOfScope,
}

impl IntentType {
    /// All categories, in prompt order.
    pub const ALL: [Self; 8] = [
        Self::DrugInfo,
        Self::GuidelineLookup,
        Self::ResearchQuery,
        Self::CompoundQuery,
        Self::ClinicalQuestion,
        Self::UrgentDiagnostic,
        Self::GeneralMedical,
        Self::OutOfScope,
    ];

    /// Agents normally invoked for this intent.
    #[must_use]
    pub const fn default_agents(self) -> &'static [&'static str] {
        match self {
            Self::DrugInfo => &[DRUG_AGENT],
            Self::GuidelineLookup | Self::UrgentDiagnostic => &[GUIDELINE_AGENT],
            Self::ResearchQuery => &[RESEARCH_AGENT],
            Self::CompoundQuery => &[DRUG_AGENT, RESEARCH_AGENT],
            Self::ClinicalQuestion => &[GUIDELINE_AGENT, DRUG_AGENT, RESEARCH_AGENT],
            Self::GeneralMedical => &[GENERAL_AGENT],
            Self::OutOfScope => &[],
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DrugInfo => "drug_info",
            Self::GuidelineLookup => "guideline_lookup",
            Self::ResearchQuery => "research_query",
            Self::CompoundQuery => "compound_query",
            Self::ClinicalQuestion => "clinical_question",
            Self::UrgentDiagnostic => "urgent_diagnostic",
            Self::GeneralMedical => "general_medical",
            Self::OutOfScope => "out_of_scope",
        }
    }

    /// Parses a wire name (case-insensitive). Returns `None` for unknown names.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|intent| intent.as_str() == lower)
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of intent classification.
///
/// Invariants, enforced by [`IntentResult::new`]: confidence is finite and
/// in `[0, 1]`, every agent is in [`VALID_AGENTS`] (no duplicates), and the
/// reasoning is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    intent: IntentType,
    confidence: f32,
    agents_to_call: Vec<String>,
    reasoning: String,
}

impl IntentResult {
    /// Builds a validated result. Unknown agent names are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidInput`] if the confidence is out of range
    /// or the reasoning is blank.
    pub fn new<I, S>(
        intent: IntentType,
        confidence: f32,
        agents: I,
        reasoning: impl Into<String>,
    ) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(AgentError::InvalidInput {
                message: format!("confidence {confidence} is outside [0, 1]"),
            });
        }

        let reasoning = reasoning.into();
        if reasoning.trim().is_empty() {
            return Err(AgentError::InvalidInput {
                message: "classification reasoning must not be empty".to_string(),
            });
        }

        let mut agents_to_call: Vec<String> = Vec::new();
        for agent in agents {
            let name = agent.as_ref().trim();
            if is_valid_agent(name) && !agents_to_call.iter().any(|a| a == name) {
                agents_to_call.push(name.to_string());
            }
        }

        Ok(Self {
            intent,
            confidence,
            agents_to_call,
            reasoning,
        })
    }

    /// The intent category.
    #[must_use]
    pub const fn intent(&self) -> IntentType {
        self.intent
    }

    /// Confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Agents to invoke, in invocation order.
    #[must_use]
    pub fn agents_to_call(&self) -> &[String] {
        &self.agents_to_call
    }

    /// Why this intent was chosen.
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }
}
