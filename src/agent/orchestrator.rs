//! Orchestrator for the route, fan-out and synthesize workflow.
//!
//! Coordinates the full request pipeline: validate → classify (or take the
//! pre-set sub-query route) → dispatch to agents concurrently → merge
//! citations → accumulate documents.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::classifier::{IntentClassifier, route_sub_query};
use super::config::AgentConfig;
use super::dispatcher::{Dispatcher, accumulate_documents};
use super::domain::AgentRegistry;
use super::invoker::AgentInvoker;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::synthesizer::CitationSynthesizer;
use crate::core::{AgentSummary, FinalResponse, Message, Query};
use crate::error::AgentError;

/// Orchestrates a single request end to end.
///
/// Holds no per-request state; one instance can serve any number of
/// concurrent requests.
pub struct Orchestrator {
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    synthesizer: CitationSynthesizer,
}

impl Orchestrator {
    /// Creates an orchestrator over `registry`.
    ///
    /// With a provider, classification uses the LLM (falling back to
    /// keywords) and multi-agent answers are composed when
    /// [`AgentConfig::compose`] is set. Without one, routing is keyword
    /// based and synthesis is mechanical. Prompt templates are loaded from
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        provider: Option<Arc<dyn LlmProvider>>,
        registry: AgentRegistry,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let classifier = IntentClassifier::new(config, prompts.classifier, provider.clone());

        let invoker = AgentInvoker::new(config.agent_timeout, config.locale);
        let dispatcher =
            Dispatcher::new(registry, invoker).with_agent_timeouts(config.agent_timeouts.clone());

        let mut synthesizer = CitationSynthesizer::new(config.locale);
        if config.compose
            && let Some(provider) = provider
        {
            synthesizer = synthesizer.with_composer(config, prompts.composer, provider);
        }

        Self::from_parts(classifier, dispatcher, synthesizer)
    }

    /// Assembles an orchestrator from already-built components.
    #[must_use]
    pub const fn from_parts(
        classifier: IntentClassifier,
        dispatcher: Dispatcher,
        synthesizer: CitationSynthesizer,
    ) -> Self {
        Self {
            classifier,
            dispatcher,
            synthesizer,
        }
    }

    /// The intent classifier.
    #[must_use]
    pub const fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Handles a request.
    ///
    /// Agent failures and timeouts never fail the request; they show up as
    /// degraded entries in [`FinalResponse::agents`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidInput`] if the message is empty or
    /// whitespace-only.
    pub async fn handle(&self, query: Query) -> Result<FinalResponse, AgentError> {
        if query.text.trim().is_empty() {
            return Err(AgentError::InvalidInput {
                message: "message must not be empty".to_string(),
            });
        }

        let start = Instant::now();

        let intent = match &query.sub_query {
            Some(sub_query) => {
                debug!(?sub_query, "pre-set sub-query, skipping classification");
                route_sub_query(sub_query)?
            }
            None => {
                self.classifier
                    .classify(&query.text, &query.history)
                    .await?
            }
        };

        let outcomes = self.dispatcher.dispatch(&query, &intent).await;
        let synthesis = self.synthesizer.synthesize(&query, &outcomes).await;
        let documents = accumulate_documents(&query.prior_documents, &outcomes);
        let agents: Vec<AgentSummary> = outcomes.iter().map(AgentSummary::from).collect();

        let elapsed = start.elapsed();
        info!(
            intent = %intent.intent(),
            agents = agents.len(),
            degraded = agents.iter().filter(|a| a.error.is_some()).count(),
            references = synthesis.references.len(),
            documents = documents.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "request complete"
        );

        Ok(FinalResponse {
            text: synthesis.text,
            references: synthesis.references,
            documents,
            intent,
            agents,
            elapsed,
        })
    }

    /// Convenience wrapper around [`handle`](Self::handle) for plain text.
    ///
    /// # Errors
    ///
    /// Same as [`handle`](Self::handle).
    pub async fn handle_message(
        &self,
        text: &str,
        history: Vec<Message>,
    ) -> Result<FinalResponse, AgentError> {
        self.handle(Query::new(text).with_history(history)).await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("classifier", &self.classifier)
            .field("dispatcher", &self.dispatcher)
            .field("synthesizer", &self.synthesizer)
            .finish()
    }
}
