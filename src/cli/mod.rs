//! CLI layer for medroute.
//!
//! Provides the command-line interface using clap, with commands for
//! classifying messages, answering questions end to end, merging agent
//! outcomes offline and scaffolding prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
