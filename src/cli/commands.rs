//! CLI command implementations.
//!
//! Each command returns its rendered output as a `String`. Async work is
//! bridged with a tokio runtime created inside the command.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::agent::client::create_provider;
use crate::agent::config::{AgentConfig, AgentConfigBuilder};
use crate::agent::locale::Locale;
use crate::agent::prompt::PromptSet;
use crate::agent::{IntentClassifier, Orchestrator, llm_registry, synthesize_mechanical};
use crate::cli::output::{OutputFormat, format_intent, format_response, format_synthesis};
use crate::cli::parser::{Cli, Commands};
use crate::core::{AgentOutcome, Message, Query, SubQuery};
use crate::error::{CommandError, Error, Result};

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let locale = parse_locale(cli.locale.as_deref())?;

    match &cli.command {
        Commands::Classify { message, offline } => cmd_classify(message, *offline, locale, format),
        Commands::Ask {
            message,
            history,
            sub_query,
            timeout,
            max_retries,
            no_compose,
            prompt_dir,
        } => {
            let params = AskParams {
                message,
                history: history.as_deref(),
                sub_query: sub_query.as_deref(),
                timeout: *timeout,
                max_retries: *max_retries,
                compose: !*no_compose,
                prompt_dir: prompt_dir.as_deref(),
                locale,
            };
            cmd_ask(&params, format)
        }
        Commands::Synthesize { input } => cmd_synthesize(input.as_deref(), locale, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Parameters for the `ask` command.
struct AskParams<'a> {
    message: &'a str,
    history: Option<&'a Path>,
    sub_query: Option<&'a str>,
    timeout: Option<u64>,
    max_retries: Option<u32>,
    compose: bool,
    prompt_dir: Option<&'a Path>,
    locale: Option<Locale>,
}

fn parse_locale(tag: Option<&str>) -> Result<Option<Locale>> {
    tag.map(|tag| {
        Locale::parse(tag).ok_or_else(|| {
            Error::from(CommandError::InvalidInput(format!(
                "unknown locale '{tag}' (expected en or es)"
            )))
        })
    })
    .transpose()
}

/// Starts a config builder from the environment with CLI overrides applied.
fn config_builder(locale: Option<Locale>) -> AgentConfigBuilder {
    let builder = AgentConfig::builder().from_env();
    match locale {
        Some(locale) => builder.locale(locale),
        None => builder,
    }
}

fn build_config(builder: AgentConfigBuilder) -> Result<AgentConfig> {
    builder.build().map_err(|e| {
        Error::from(CommandError::ExecutionFailed(format!(
            "Agent configuration error: {e}"
        )))
    })
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::from(CommandError::ExecutionFailed(format!(
                "Failed to create async runtime: {e}"
            )))
        })
}

/// Classifies a message and prints the routing decision.
fn cmd_classify(
    message: &str,
    offline: bool,
    locale: Option<Locale>,
    format: OutputFormat,
) -> Result<String> {
    let config = build_config(config_builder(locale))?;

    let provider = if offline || config.api_key.is_none() {
        debug!(offline, "classifying with keyword routing only");
        None
    } else {
        Some(create_provider(&config).map_err(|e| {
            CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
        })?)
    };

    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let classifier = IntentClassifier::new(&config, prompts.classifier, provider);

    let rt = runtime()?;
    let intent = rt.block_on(classifier.classify(message, &[]))?;
    Ok(format_intent(&intent, format))
}

/// Answers a question through the full pipeline.
fn cmd_ask(params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    let mut builder = config_builder(params.locale).compose(params.compose);
    if let Some(secs) = params.timeout {
        builder = builder.agent_timeout(Duration::from_secs(secs));
    }
    if let Some(n) = params.max_retries {
        builder = builder.max_retries(n);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = build_config(builder)?;

    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!(
            "Provider creation failed: {e}. `ask` needs an LLM provider; \
             `classify --offline` and `synthesize` work without one"
        ))
    })?;

    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let registry = llm_registry(&config, &prompts, &provider)?;
    let orchestrator = Orchestrator::new(&config, Some(provider), registry);

    let mut query = Query::new(params.message);
    if let Some(path) = params.history {
        query = query.with_history(read_history(path)?);
    }
    if let Some(raw) = params.sub_query {
        let sub_query: SubQuery = serde_json::from_str(raw)
            .map_err(|e| CommandError::InvalidInput(format!("invalid --sub-query: {e}")))?;
        query = query.with_sub_query(sub_query);
    }

    let rt = runtime()?;
    let response = rt.block_on(orchestrator.handle(query))?;
    Ok(format_response(&response, format))
}

fn read_history(path: &Path) -> Result<Vec<Message>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CommandError::InvalidInput(format!("cannot read history {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        Error::from(CommandError::InvalidInput(format!(
            "invalid history {}: {e}",
            path.display()
        )))
    })
}

/// Merges outcomes read as JSON, without any LLM call.
fn cmd_synthesize(
    input: Option<&Path>,
    locale: Option<Locale>,
    format: OutputFormat,
) -> Result<String> {
    let raw = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let outcomes: Vec<AgentOutcome> = serde_json::from_str(&raw)
        .map_err(|e| CommandError::InvalidInput(format!("invalid outcomes JSON: {e}")))?;
    let locale = match locale {
        Some(locale) => locale,
        None => build_config(AgentConfig::builder().from_env())?.locale,
    };

    let synthesis = synthesize_mechanical(&outcomes, locale);
    Ok(format_synthesis(&synthesis, format))
}

/// Writes the default prompt templates to a directory.
fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
