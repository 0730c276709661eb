//! Runs a single agent under a wall-clock budget.
//!
//! The invoker never fails: errors, panics and timeouts all come back as a
//! well-formed [`AgentOutcome`] whose text is safe to show the user.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::domain::DomainAgent;
use super::locale::Locale;
use crate::core::{AgentOutcome, Query};

// Panic isolation relies on `JoinError::is_panic`, which abort never reaches.
#[cfg(not(panic = "unwind"))]
compile_error!("medroute must be built with panic = \"unwind\"");

/// Default per-agent time budget.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Invokes agents in their own task with a hard timeout.
#[derive(Debug, Clone, Copy)]
pub struct AgentInvoker {
    default_timeout: Duration,
    locale: Locale,
}

impl Default for AgentInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_TIMEOUT, Locale::default())
    }
}

impl AgentInvoker {
    /// Creates an invoker with the given default budget and message locale.
    #[must_use]
    pub const fn new(default_timeout: Duration, locale: Locale) -> Self {
        Self {
            default_timeout,
            locale,
        }
    }

    /// Default budget applied when a call gives none.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Locale of degraded-outcome messages.
    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    /// Runs `agent` on `query` within `timeout` (or the default budget).
    ///
    /// On timeout the agent's task is aborted and not awaited; whatever it
    /// was doing is dropped at its next suspension point.
    pub async fn invoke(
        &self,
        agent: Arc<dyn DomainAgent>,
        query: Query,
        timeout: Option<Duration>,
    ) -> AgentOutcome {
        let name = agent.name().to_string();
        let budget = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();

        let mut handle = tokio::spawn(async move { agent.run(query).await });

        match tokio::time::timeout(budget, &mut handle).await {
            Ok(Ok(Ok(reply))) => {
                let elapsed = start.elapsed();
                debug!(
                    agent = %name,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    documents = reply.documents.len(),
                    "agent completed"
                );
                AgentOutcome::ok(name, reply, elapsed)
            }
            Ok(Ok(Err(err))) => {
                warn!(agent = %name, error = %err, "agent failed");
                let message = self.locale.unavailable(&name);
                AgentOutcome::failed(name, message, err.to_string(), start.elapsed())
            }
            Ok(Err(join_err)) => {
                let detail = if join_err.is_panic() {
                    "agent panicked".to_string()
                } else {
                    format!("agent task cancelled: {join_err}")
                };
                warn!(agent = %name, error = %detail, "agent task did not complete");
                let message = self.locale.unavailable(&name);
                AgentOutcome::failed(name, message, detail, start.elapsed())
            }
            Err(_) => {
                handle.abort();
                warn!(
                    agent = %name,
                    budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                    "agent exceeded its time budget"
                );
                let message = self.locale.timed_out(&name, budget);
                AgentOutcome::timed_out(name, message, start.elapsed())
            }
        }
    }
}
