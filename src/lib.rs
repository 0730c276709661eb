//! # medroute
//!
//! Multi-agent orchestration for medical question answering.
//!
//! A request is classified into an intent, fanned out to the specialised
//! agents that intent calls for (drug information, literature research,
//! clinical guidelines, general medicine), and the agents' answers are
//! merged into one response whose `[n]` citation markers point into a
//! single, consistently numbered reference list.
//!
//! Every agent runs under its own time budget. Timeouts, errors and panics
//! in one agent turn into a degraded section of the answer; they never fail
//! the request or affect sibling agents.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use medroute::agent::{AgentConfig, AgentRegistry, FnAgent, Orchestrator};
//! use medroute::core::{AgentReply, DRUG_AGENT, Query};
//!
//! # async fn run() -> Result<(), medroute::AgentError> {
//! let drug = FnAgent::new(DRUG_AGENT, |_q: Query| async {
//!     Ok(AgentReply::text("Max 4 g/day [1].\nReferences\n[1] Product label"))
//! });
//! let registry = AgentRegistry::new().with(Arc::new(drug))?;
//!
//! let config = AgentConfig::builder().build()?;
//! let orchestrator = Orchestrator::new(&config, None, registry);
//! let response = orchestrator
//!     .handle(Query::new("paracetamol maximum dose"))
//!     .await?;
//! assert_eq!(response.references, ["Product label"]);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;

pub use error::{AgentError, CommandError, Error, Result, ServiceError};
