//! Error types for medroute.
//!
//! [`ServiceError`] is the taxonomy of remote-service failures consumed by
//! the retry layer. [`AgentError`] covers everything the orchestration core
//! can report, and [`Error`] unifies those with CLI and I/O failures.

use std::time::Duration;

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Orchestration or agent failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by calls to remote services (databases, search APIs, LLMs).
///
/// Connection, rate-limit/timeout and server errors are transient and
/// retried by [`RetryExecutor`](crate::agent::retry::RetryExecutor);
/// validation and unclassified errors are not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Could not reach the service.
    #[error("connection to {url} failed: {message}")]
    Connection {
        /// Service URL.
        url: String,
        /// Underlying failure.
        message: String,
    },

    /// Request timed out or was rate limited.
    #[error("request to {url} timed out or was rate limited: {message}")]
    RateLimited {
        /// Service URL.
        url: String,
        /// Underlying failure.
        message: String,
        /// Server-provided wait hint, if any.
        retry_after: Option<Duration>,
    },

    /// The service answered with a 5xx status.
    #[error("server error from {url} (status {status}): {message}")]
    Server {
        /// Service URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response detail.
        message: String,
    },

    /// The request was rejected as invalid. Never retried.
    #[error("validation error from {url}: {message}")]
    Validation {
        /// Service URL.
        url: String,
        /// Rejection detail.
        message: String,
    },

    /// Anything else. Never retried.
    #[error("unexpected service error: {message}")]
    Other {
        /// Failure detail.
        message: String,
    },
}

impl ServiceError {
    /// Classifies an HTTP status code returned by `url`.
    #[must_use]
    pub fn from_status(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let url = url.into();
        let message = message.into();
        match status {
            408 | 429 => Self::RateLimited {
                url,
                message,
                retry_after: None,
            },
            500..=599 => Self::Server {
                url,
                status,
                message,
            },
            400..=499 => Self::Validation { url, message },
            _ => Self::Other {
                message: format!("{url} returned status {status}: {message}"),
            },
        }
    }

    /// Returns the URL of the originating service, when known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Connection { url, .. }
            | Self::RateLimited { url, .. }
            | Self::Server { url, .. }
            | Self::Validation { url, .. } => Some(url),
            Self::Other { .. } => None,
        }
    }
}

/// Agent and orchestration errors.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No API key configured for the LLM provider.
    #[error("API key missing: set OPENAI_API_KEY or MEDROUTE_API_KEY")]
    ApiKeyMissing,

    /// Unknown provider name in configuration.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The rejected provider name.
        name: String,
    },

    /// The LLM API call failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Failure detail.
        message: String,
        /// HTTP status, if the failure carried one.
        status: Option<u16>,
    },

    /// The LLM answered with something that could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// Parse failure detail.
        message: String,
        /// The raw response content.
        content: String,
    },

    /// A remote service used by an agent failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Invalid user input, rejected before any external call.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input.
        message: String,
    },

    /// Invalid configuration value or combination.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        message: String,
    },

    /// Orchestration-level failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure detail.
        message: String,
    },
}

/// CLI command errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The command could not be executed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The command received unusable input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
