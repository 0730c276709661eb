//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// medroute: multi-agent medical question answering.
///
/// Routes a question to specialised agents, runs them concurrently and
/// merges their answers with one consistent citation list.
#[derive(Parser, Debug)]
#[command(name = "medroute")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (info-level logs on stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Language for degraded-service messages and section headers (en, es).
    #[arg(long, env = "MEDROUTE_LOCALE", global = true)]
    pub locale: Option<String>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a message and show which agents would answer it.
    ///
    /// Uses the LLM classifier when an API key is configured, falling back
    /// to keyword routing if the call fails.
    #[command(after_help = r#"Examples:
  medroute classify "ibuprofen dose for children"
  medroute classify --offline "latest trials on SGLT2 inhibitors"
  medroute --format json classify "warfarin and aspirin" | jq '.agents_to_call'
"#)]
    Classify {
        /// Message to classify.
        message: String,

        /// Use keyword routing only, without calling the LLM.
        #[arg(long)]
        offline: bool,
    },

    /// Answer a question end to end.
    ///
    /// Classifies the question, asks the selected agents concurrently and
    /// prints the merged answer with its reference list. Requires an API key.
    #[command(after_help = r#"Examples:
  medroute ask "What is the maximum daily dose of paracetamol?"
  medroute ask "¿Qué dicen las guías sobre la HTA?" --locale es
  medroute ask "and in renal failure?" --history turns.json
  medroute ask "metformin" --sub-query '{"kind":"drug","drug_name":"metformin"}'
  medroute ask "statins in the elderly" --timeout 20 --no-compose
"#)]
    Ask {
        /// The question.
        message: String,

        /// JSON file with prior turns (`[{"role": "user", "content": "..."}]`).
        #[arg(long)]
        history: Option<PathBuf>,

        /// Pre-set sub-query as JSON; skips classification.
        #[arg(long)]
        sub_query: Option<String>,

        /// Per-agent time budget in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Retries for transient LLM failures.
        #[arg(long)]
        max_retries: Option<u32>,

        /// Skip LLM composition; merge sections mechanically.
        #[arg(long)]
        no_compose: bool,

        /// Directory with prompt template overrides.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Merge agent outcomes offline.
    ///
    /// Reads a JSON array of outcomes (`agent`, `response_text`, optional
    /// `documents`, `status`, `error`) and prints the mechanical synthesis.
    #[command(after_help = r#"Examples:
  medroute synthesize outcomes.json
  cat outcomes.json | medroute synthesize
  medroute --format json synthesize outcomes.json | jq '.references'
"#)]
    Synthesize {
        /// Input file (reads from stdin if omitted or "-").
        input: Option<PathBuf>,
    },

    /// Write the default prompt templates to a directory for customization.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  medroute init-prompts                   # ~/.config/medroute/prompts
  medroute init-prompts --dir ./prompts   # Custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to ~/.config/medroute/prompts).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "medroute",
            "--format",
            "json",
            "ask",
            "statins?",
            "--timeout",
            "15",
            "--no-compose",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Ask {
                message,
                timeout,
                no_compose,
                ..
            } => {
                assert_eq!(message, "statins?");
                assert_eq!(timeout, Some(15));
                assert!(no_compose);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["medroute", "classify", "x", "--offline", "-v"])
            .unwrap_or_else(|_| unreachable!());
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Classify { offline: true, .. }));
    }

    #[test]
    fn test_synthesize_input_is_optional() {
        let cli = Cli::try_parse_from(["medroute", "synthesize"])
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(cli.command, Commands::Synthesize { input: None }));
    }
}
