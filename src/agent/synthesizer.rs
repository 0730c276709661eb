//! Fan-in of agent outcomes into one citation-consistent answer.
//!
//! Each agent numbers its citations from `[1]`. The synthesizer shifts every
//! agent's markers past the references emitted before it, concatenates the
//! reference lists in agent order, and appends a single reference block.
//! When a composer LLM is configured, multi-agent answers are rewritten
//! into flowing prose after numbering is fixed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::citation::{cited_markers, format_reference_block, parse_response, renumber_markers};
use super::config::AgentConfig;
use super::locale::Locale;
use super::prompt::build_composer_prompt;
use super::provider::LlmProvider;
use super::retry::RetryExecutor;
use super::terminology::terminology_note;
use super::traits::{Agent, execute_with_retry};
use crate::core::{AgentOutcome, Document, Query};
use crate::error::AgentError;

/// Merged answer produced from a set of outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    /// Answer text, terminology note and the combined reference block.
    pub text: String,
    /// Combined references; entry `i` is cited as `[i + 1]`.
    pub references: Vec<String>,
    /// Every outcome's documents, in agent order.
    pub documents: Vec<Document>,
}

/// LLM role that merges per-agent sections into prose.
pub struct ComposerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ComposerAgent {
    /// Creates a new composer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.composer_model.clone(),
            max_tokens: config.composer_max_tokens,
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for ComposerAgent {
    fn role(&self) -> &'static str {
        "composer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

struct Composer {
    agent: ComposerAgent,
    provider: Arc<dyn LlmProvider>,
    retry: RetryExecutor,
}

/// One agent's renumbered contribution.
#[derive(Debug, Clone)]
struct Section {
    agent: String,
    body: String,
}

/// Merges outcomes, optionally composing them with an LLM.
pub struct CitationSynthesizer {
    locale: Locale,
    composer: Option<Composer>,
}

impl CitationSynthesizer {
    /// Creates a purely mechanical synthesizer.
    #[must_use]
    pub const fn new(locale: Locale) -> Self {
        Self {
            locale,
            composer: None,
        }
    }

    /// Enables LLM composition of multi-agent answers.
    #[must_use]
    pub fn with_composer(
        mut self,
        config: &AgentConfig,
        system_prompt: String,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        self.composer = Some(Composer {
            agent: ComposerAgent::new(config, system_prompt),
            provider,
            retry: RetryExecutor::new(config.retry),
        });
        self
    }

    /// Merges `outcomes` into one answer. Never fails.
    ///
    /// Composition failures (provider error, empty output, or citation
    /// markers outside the combined list) fall back to the mechanical
    /// per-agent sections.
    pub async fn synthesize(&self, query: &Query, outcomes: &[AgentOutcome]) -> Synthesis {
        let (sections, references) = renumber_all(outcomes);

        let body = match (&self.composer, sections.len()) {
            (Some(composer), n) if n > 1 => {
                match self
                    .compose(composer, &query.text, &sections, references.len())
                    .await
                {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "composition failed, using per-agent sections");
                        assemble_sections(&sections, self.locale)
                    }
                }
            }
            _ => assemble_sections(&sections, self.locale),
        };

        finish(body, references, outcomes, self.locale)
    }

    async fn compose(
        &self,
        composer: &Composer,
        question: &str,
        sections: &[Section],
        reference_count: usize,
    ) -> Result<String, AgentError> {
        let headed: Vec<(String, String)> = sections
            .iter()
            .map(|s| (self.locale.section_header(&s.agent), s.body.clone()))
            .collect();
        let user_msg = build_composer_prompt(question, &headed, reference_count);
        let response = execute_with_retry(
            &composer.agent,
            &*composer.provider,
            &user_msg,
            &composer.retry,
        )
        .await?;

        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Err(AgentError::ResponseParse {
                message: "composer returned an empty answer".to_string(),
                content: response.content,
            });
        }
        let max = u32::try_from(reference_count).unwrap_or(u32::MAX);
        if let Some(bad) = cited_markers(&text).into_iter().find(|&m| m == 0 || m > max) {
            return Err(AgentError::ResponseParse {
                message: format!("composer cited [{bad}] but only {reference_count} references exist"),
                content: response.content,
            });
        }
        Ok(text)
    }
}

impl std::fmt::Debug for CitationSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CitationSynthesizer")
            .field("locale", &self.locale)
            .field("composer", &self.composer.as_ref().map(|c| c.provider.name()))
            .finish()
    }
}

/// Merges `outcomes` without any LLM call.
///
/// Pure: the same outcomes always produce the same synthesis.
#[must_use]
pub fn synthesize_mechanical(outcomes: &[AgentOutcome], locale: Locale) -> Synthesis {
    let (sections, references) = renumber_all(outcomes);
    let body = assemble_sections(&sections, locale);
    finish(body, references, outcomes, locale)
}

/// Renumbers every outcome's markers into one global sequence.
///
/// Outcomes with blank text are skipped. A malformed reference block leaves
/// that outcome's text as is and contributes no references.
fn renumber_all(outcomes: &[AgentOutcome]) -> (Vec<Section>, Vec<String>) {
    let mut sections = Vec::with_capacity(outcomes.len());
    let mut references: Vec<String> = Vec::new();

    for outcome in outcomes {
        if outcome.response_text.trim().is_empty() {
            continue;
        }
        let parsed = match parse_response(&outcome.response_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(agent = %outcome.agent, error = %e, "passing response through un-renumbered");
                sections.push(Section {
                    agent: outcome.agent.clone(),
                    body: outcome.response_text.trim_end().to_string(),
                });
                continue;
            }
        };

        let offset = u32::try_from(references.len()).unwrap_or(u32::MAX);
        let dangling: Vec<u32> = parsed.citations.dangling().collect();
        if !dangling.is_empty() {
            debug!(agent = %outcome.agent, markers = ?dangling, "markers without references");
        }
        debug!(
            agent = %outcome.agent,
            offset,
            references = parsed.citations.references.len(),
            "renumbering citations"
        );

        sections.push(Section {
            agent: outcome.agent.clone(),
            body: renumber_markers(&parsed.body, offset),
        });
        references.extend(parsed.citations.references);
    }

    (sections, references)
}

/// One section passes through; several get a header each.
fn assemble_sections(sections: &[Section], locale: Locale) -> String {
    match sections {
        [] => String::new(),
        [only] => only.body.clone(),
        many => many
            .iter()
            .map(|s| format!("{}\n\n{}", locale.section_header(&s.agent), s.body))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn finish(
    body: String,
    references: Vec<String>,
    outcomes: &[AgentOutcome],
    locale: Locale,
) -> Synthesis {
    let mut text = body;
    if let Some(note) = terminology_note(&text, locale) {
        text.push_str("\n\n");
        text.push_str(&note);
    }
    if !references.is_empty() {
        text.push_str("\n\n");
        text.push_str(&format_reference_block(
            locale.references_header(),
            &references,
        ));
    }

    let documents = outcomes
        .iter()
        .flat_map(|o| o.documents.iter().cloned())
        .collect();

    Synthesis {
        text,
        references,
        documents,
    }
}
