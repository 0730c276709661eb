//! Fan-out of a classified request to its agents, and fan-in of the outcomes.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use super::domain::AgentRegistry;
use super::invoker::AgentInvoker;
use crate::core::{AgentOutcome, AgentReply, Document, IntentResult, Query};

/// Agent name on the synthetic outcome produced when nothing is routed.
pub const ROUTER_AGENT: &str = "router";

/// Dispatches queries to registered agents through an [`AgentInvoker`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: AgentRegistry,
    invoker: AgentInvoker,
    agent_timeouts: HashMap<String, Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: AgentRegistry, invoker: AgentInvoker) -> Self {
        Self {
            registry,
            invoker,
            agent_timeouts: HashMap::new(),
        }
    }

    /// Sets per-agent time budgets, overriding the invoker's default.
    #[must_use]
    pub fn with_agent_timeouts(mut self, timeouts: HashMap<String, Duration>) -> Self {
        self.agent_timeouts = timeouts;
        self
    }

    /// The registered agents.
    #[must_use]
    pub const fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Invokes every agent in `intent`, concurrently when there are several.
    ///
    /// Outcomes come back in the order of
    /// [`agents_to_call`](IntentResult::agents_to_call), whatever order the
    /// agents finish in. No agent's failure or timeout affects another.
    pub async fn dispatch(&self, query: &Query, intent: &IntentResult) -> Vec<AgentOutcome> {
        let agents = intent.agents_to_call();
        debug!(intent = %intent.intent(), agents = ?agents, "dispatching");

        match agents {
            [] => {
                let text = self.invoker.locale().out_of_scope();
                vec![AgentOutcome::ok(
                    ROUTER_AGENT,
                    AgentReply::text(text),
                    Duration::ZERO,
                )]
            }
            [only] => vec![self.invoke_one(only, query).await],
            many => join_all(many.iter().map(|name| self.invoke_one(name, query))).await,
        }
    }

    async fn invoke_one(&self, name: &str, query: &Query) -> AgentOutcome {
        let Some(agent) = self.registry.get(name) else {
            warn!(agent = %name, "agent is not registered");
            let message = self.invoker.locale().unavailable(name);
            return AgentOutcome::failed(name, message, "agent is not registered", Duration::ZERO);
        };
        let timeout = self.agent_timeouts.get(name).copied();
        self.invoker.invoke(agent, query.clone(), timeout).await
    }
}

/// Appends this turn's documents, in agent order, onto the earlier turns'.
#[must_use]
pub fn accumulate_documents(prior: &[Document], outcomes: &[AgentOutcome]) -> Vec<Document> {
    prior
        .iter()
        .chain(outcomes.iter().flat_map(|o| o.documents.iter()))
        .cloned()
        .collect()
}
