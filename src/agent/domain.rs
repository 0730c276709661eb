//! Domain agents: the units the dispatcher fans out to.
//!
//! A domain agent takes its own copy of the [`Query`] and returns an
//! [`AgentReply`]. What it does in between (database lookups, literature
//! search, LLM calls) is its own business; it is expected to route remote
//! calls through a [`RetryExecutor`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::config::AgentConfig;
use super::prompt::{PromptSet, build_agent_prompt};
use super::provider::LlmProvider;
use super::retry::RetryExecutor;
use super::traits::{Agent, execute_with_retry};
use crate::core::{AgentReply, Query, VALID_AGENTS, is_valid_agent};
use crate::error::AgentError;

/// A specialised agent the router can select.
#[async_trait]
pub trait DomainAgent: Send + Sync {
    /// Registry name, one of [`VALID_AGENTS`](crate::core::VALID_AGENTS).
    fn name(&self) -> &str;

    /// Answers the query.
    ///
    /// # Errors
    ///
    /// Any error is turned into a degraded outcome by the invoker.
    async fn run(&self, query: Query) -> Result<AgentReply, AgentError>;
}

/// Adapts an async closure into a [`DomainAgent`].
pub struct FnAgent<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnAgent<F>
where
    F: Fn(Query) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AgentReply, AgentError>> + Send,
{
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> DomainAgent for FnAgent<F>
where
    F: Fn(Query) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AgentReply, AgentError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, query: Query) -> Result<AgentReply, AgentError> {
        (self.func)(query).await
    }
}

/// Agents available to the dispatcher, keyed by name.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn DomainAgent>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `agent` under its own name, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if the name is not whitelisted.
    pub fn register(&mut self, agent: Arc<dyn DomainAgent>) -> Result<(), AgentError> {
        let name = agent.name().to_string();
        if !is_valid_agent(&name) {
            return Err(AgentError::InvalidConfig {
                message: format!("'{name}' is not a valid agent name"),
            });
        }
        debug!(agent = %name, "registered agent");
        self.agents.insert(name, agent);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn with(mut self, agent: Arc<dyn DomainAgent>) -> Result<Self, AgentError> {
        self.register(agent)?;
        Ok(self)
    }

    /// Looks up an agent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn DomainAgent>> {
        self.agents.get(name).cloned()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.names())
            .finish()
    }
}

/// A domain agent answered directly by the LLM.
///
/// Stands in for a backend-driven agent (drug database, literature search,
/// guideline index) when only an LLM is available. The system prompt asks
/// for `[n]` markers and a trailing reference block, so its output feeds
/// the citation synthesizer like any other agent's.
pub struct LlmAgent {
    name: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    provider: Arc<dyn LlmProvider>,
    retry: RetryExecutor,
}

impl LlmAgent {
    /// Creates an LLM-backed agent registered as `name`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        config: &AgentConfig,
        system_prompt: String,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            model: config.agent_model.clone(),
            max_tokens: config.agent_max_tokens,
            system_prompt,
            provider,
            retry: RetryExecutor::new(config.retry),
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn role(&self) -> &'static str {
        "domain"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Registers an [`LlmAgent`] under every whitelisted name.
///
/// # Errors
///
/// Returns [`AgentError::InvalidConfig`] if registration fails.
pub fn llm_registry(
    config: &AgentConfig,
    prompts: &PromptSet,
    provider: &Arc<dyn LlmProvider>,
) -> Result<AgentRegistry, AgentError> {
    let mut registry = AgentRegistry::new();
    for name in VALID_AGENTS {
        let system_prompt = prompts.for_agent(name).unwrap_or_default().to_string();
        registry.register(Arc::new(LlmAgent::new(
            name,
            config,
            system_prompt,
            Arc::clone(provider),
        )))?;
    }
    Ok(registry)
}

#[async_trait]
impl DomainAgent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, query: Query) -> Result<AgentReply, AgentError> {
        let user_msg = build_agent_prompt(&query);
        let response = execute_with_retry(self, &*self.provider, &user_msg, &self.retry).await?;
        Ok(AgentReply::text(response.content))
    }
}
