//! Multi-agent orchestration engine.
//!
//! Routes a medical question to specialised agents, runs them concurrently
//! under isolated time budgets, and merges their answers into one response
//! with a single, consistently numbered reference list.
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator
//!   ├── IntentClassifier (LLM JSON verdict, keyword fallback)
//!   ├── Dispatcher → N concurrent AgentInvoker calls
//!   │   └── Each DomainAgent runs under its own timeout
//!   │       (remote calls wrapped in RetryExecutor)
//!   └── CitationSynthesizer
//!       ├── renumber [n] markers per agent offset
//!       ├── optional ComposerAgent prose
//!       └── terminology note + combined reference block
//! ```
//!
//! # Feature Gate
//!
//! The `OpenAI`-compatible provider requires the `openai` feature (on by
//! default). Without it, classification is keyword based and synthesis is
//! mechanical.

pub mod citation;
pub mod classifier;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod invoker;
pub mod locale;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod synthesizer;
pub mod terminology;
pub mod traits;

// Re-export key types
pub use citation::{CitationInfo, ParsedResponse, parse_response, renumber_markers};
pub use classifier::{ClassifierAgent, IntentClassifier, keyword_route, route_sub_query};
pub use client::create_provider;
pub use config::{AgentConfig, AgentConfigBuilder};
pub use dispatcher::{Dispatcher, accumulate_documents};
pub use domain::{AgentRegistry, DomainAgent, FnAgent, LlmAgent, llm_registry};
pub use invoker::AgentInvoker;
pub use locale::Locale;
pub use message::{ChatMessage, ChatRequest, ChatResponse, ChatRole, TokenUsage};
pub use orchestrator::Orchestrator;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use retry::{RetryConfig, RetryExecutor, Retryable};
pub use synthesizer::{CitationSynthesizer, ComposerAgent, Synthesis, synthesize_mechanical};
pub use traits::{Agent, AgentResponse, execute_with_retry};
