//! User-facing text for degraded outcomes and response sections.

use std::time::Duration;

use crate::core::{DRUG_AGENT, GENERAL_AGENT, GUIDELINE_AGENT, RESEARCH_AGENT};

/// Language of the messages the orchestrator writes itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Spanish.
    Es,
}

impl Locale {
    /// Parses a locale tag such as `en`, `es`, `es-ES` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let lang = lower.split(['-', '_']).next().unwrap_or_default();
        match lang {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    /// Shown in place of an agent's answer when it ran out of time.
    #[must_use]
    pub fn timed_out(self, agent: &str, budget: Duration) -> String {
        let secs = budget.as_secs_f64();
        match self {
            Self::En => format!(
                "The {} did not answer within its {secs:.0}s time budget. \
                 This part of the answer is unavailable.",
                self.agent_label(agent)
            ),
            Self::Es => format!(
                "El {} no respondió dentro de su límite de {secs:.0}s. \
                 Esta parte de la respuesta no está disponible.",
                self.agent_label(agent)
            ),
        }
    }

    /// Shown in place of an agent's answer when it failed.
    #[must_use]
    pub fn unavailable(self, agent: &str) -> String {
        match self {
            Self::En => format!(
                "The {} is temporarily unavailable. Please try again later.",
                self.agent_label(agent)
            ),
            Self::Es => format!(
                "El {} no está disponible temporalmente. Inténtelo de nuevo más tarde.",
                self.agent_label(agent)
            ),
        }
    }

    /// Answer for out-of-scope questions.
    #[must_use]
    pub const fn out_of_scope(self) -> &'static str {
        match self {
            Self::En => {
                "This question is outside the medical topics I can help with. \
                 I can answer questions about drugs, clinical guidelines and \
                 medical research."
            }
            Self::Es => {
                "Esta pregunta está fuera de los temas médicos en los que puedo \
                 ayudar. Puedo responder sobre fármacos, guías clínicas e \
                 investigación médica."
            }
        }
    }

    /// Section header used when several agents contribute.
    #[must_use]
    pub fn section_header(self, agent: &str) -> String {
        let title = match (self, agent) {
            (Self::En, DRUG_AGENT) => "Drug information",
            (Self::En, RESEARCH_AGENT) => "Research evidence",
            (Self::En, GUIDELINE_AGENT) => "Clinical guidelines",
            (Self::En, GENERAL_AGENT) => "General information",
            (Self::Es, DRUG_AGENT) => "Información farmacológica",
            (Self::Es, RESEARCH_AGENT) => "Evidencia científica",
            (Self::Es, GUIDELINE_AGENT) => "Guías clínicas",
            (Self::Es, GENERAL_AGENT) => "Información general",
            (_, other) => return format!("## {other}"),
        };
        format!("## {title}")
    }

    /// Header of the combined reference block.
    #[must_use]
    pub const fn references_header(self) -> &'static str {
        match self {
            Self::En => "References",
            Self::Es => "Referencias",
        }
    }

    /// Header of the terminology note.
    #[must_use]
    pub const fn terminology_header(self) -> &'static str {
        match self {
            Self::En => "Terminology note",
            Self::Es => "Nota terminológica",
        }
    }

    /// Lead-in sentence of the terminology note.
    #[must_use]
    pub const fn terminology_lead(self) -> &'static str {
        match self {
            Self::En => "The following abbreviations appear without their expansion:",
            Self::Es => "Las siguientes abreviaturas aparecen sin su forma desarrollada:",
        }
    }

    fn agent_label(self, agent: &str) -> String {
        let label = match (self, agent) {
            (Self::En, DRUG_AGENT) => "drug information service",
            (Self::En, RESEARCH_AGENT) => "literature search service",
            (Self::En, GUIDELINE_AGENT) => "clinical guideline service",
            (Self::En, GENERAL_AGENT) => "general medical service",
            (Self::Es, DRUG_AGENT) => "servicio de información farmacológica",
            (Self::Es, RESEARCH_AGENT) => "servicio de búsqueda bibliográfica",
            (Self::Es, GUIDELINE_AGENT) => "servicio de guías clínicas",
            (Self::Es, GENERAL_AGENT) => "servicio médico general",
            (Self::En, other) => return format!("{other} service"),
            (Self::Es, other) => return format!("servicio {other}"),
        };
        label.to_string()
    }
}
