//! Intent classification.
//!
//! The primary path asks the LLM for a JSON verdict. Whenever that is not
//! possible (no provider, call failed, unusable output) the classifier
//! falls back to deterministic keyword routing, so classification only
//! ever fails on empty input.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::prompt::build_classifier_prompt;
use super::provider::LlmProvider;
use super::retry::RetryExecutor;
use super::traits::{Agent, execute_with_retry};
use crate::core::{
    DRUG_AGENT, GENERAL_AGENT, GUIDELINE_AGENT, IntentResult, IntentType, Message,
    RESEARCH_AGENT, SubQuery,
};
use crate::error::AgentError;

/// Confidence of a keyword match.
pub(crate) const KEYWORD_CONFIDENCE: f32 = 0.5;
/// Confidence when no keyword matched.
const DEFAULT_CONFIDENCE: f32 = 0.3;
/// Characters of the message included in log lines.
const LOG_MESSAGE_CHARS: usize = 80;

/// Research keywords (checked first).
const RESEARCH_KEYWORDS: &[&str] = &[
    "estudio",
    "ensayo",
    "evidencia",
    "metaanálisis",
    "meta-analysis",
    "pubmed",
    "trial",
    "study",
    "studies",
    "evidence",
    "literature",
    "literatura",
    "revisión sistemática",
    "systematic review",
    "cohort",
];

/// Guideline keywords (checked second).
const GUIDELINE_KEYWORDS: &[&str] = &[
    "guía",
    "guia",
    "guideline",
    "protocolo",
    "protocol",
    "recomendación",
    "recomendacion",
    "recommendation",
    "consenso",
    "consensus",
];

/// Drug keywords (checked last).
const DRUG_KEYWORDS: &[&str] = &[
    "dosis",
    "dose",
    "dosage",
    "fármaco",
    "farmaco",
    "medicamento",
    "drug",
    "medication",
    "interacción",
    "interaccion",
    "interaction",
    "contraindicación",
    "contraindicacion",
    "contraindication",
    "efectos adversos",
    "side effect",
    "adverse",
    "ibuprofeno",
    "ibuprofen",
    "paracetamol",
    "metformina",
    "metformin",
    "warfarina",
    "warfarin",
    "amoxicilina",
    "amoxicillin",
];

/// LLM role that produces the JSON classification.
pub struct ClassifierAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ClassifierAgent {
    /// Creates a new classifier agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.classifier_model.clone(),
            max_tokens: config.classifier_max_tokens,
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for ClassifierAgent {
    fn role(&self) -> &'static str {
        "classifier"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// The JSON object the classifier is asked to return.
#[derive(Debug, Deserialize)]
struct RawIntent {
    intent_type: String,
    confidence: f32,
    #[serde(default)]
    agents_to_call: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// Maps user text to the agents that should answer it.
pub struct IntentClassifier {
    agent: ClassifierAgent,
    provider: Option<Arc<dyn LlmProvider>>,
    retry: RetryExecutor,
    low_confidence_threshold: f32,
}

impl IntentClassifier {
    /// Creates a classifier. Without a provider every message is keyword-routed.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        system_prompt: String,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            agent: ClassifierAgent::new(config, system_prompt),
            provider,
            retry: RetryExecutor::new(config.retry),
            low_confidence_threshold: config.low_confidence_threshold,
        }
    }

    /// Returns `true` if an LLM provider is configured.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Classifies `message` in the context of `history`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidInput`] if the message is empty or
    /// whitespace-only. No external call is made in that case.
    pub async fn classify(
        &self,
        message: &str,
        history: &[Message],
    ) -> Result<IntentResult, AgentError> {
        if message.trim().is_empty() {
            return Err(AgentError::InvalidInput {
                message: "message must not be empty".to_string(),
            });
        }

        let result = match &self.provider {
            Some(provider) => match self.classify_with_llm(&**provider, message, history).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "LLM classification failed, using keyword fallback");
                    keyword_route(message)?
                }
            },
            None => keyword_route(message)?,
        };

        self.log_result(message, &result);
        Ok(result)
    }

    async fn classify_with_llm(
        &self,
        provider: &dyn LlmProvider,
        message: &str,
        history: &[Message],
    ) -> Result<IntentResult, AgentError> {
        let user_msg = build_classifier_prompt(message, history);
        let response = execute_with_retry(&self.agent, provider, &user_msg, &self.retry).await?;
        parse_intent(&response.content)
    }

    fn log_result(&self, message: &str, result: &IntentResult) {
        let preview: String = message.chars().take(LOG_MESSAGE_CHARS).collect();
        info!(
            intent = %result.intent(),
            confidence = result.confidence(),
            agents = ?result.agents_to_call(),
            message = %preview,
            "classified message"
        );
        if result.confidence() < self.low_confidence_threshold {
            warn!(
                intent = %result.intent(),
                confidence = result.confidence(),
                threshold = self.low_confidence_threshold,
                "low-confidence classification"
            );
        }
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("model", &self.agent.model)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("low_confidence_threshold", &self.low_confidence_threshold)
            .finish_non_exhaustive()
    }
}

/// Parses the classifier's JSON output, tolerating markdown code fences.
///
/// An unknown intent, an out-of-range confidence or blank reasoning is an
/// error. If no whitelisted agent survives for an in-scope intent, the
/// intent's default agents are used; `out_of_scope` never calls agents.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] or [`AgentError::InvalidInput`].
pub fn parse_intent(content: &str) -> Result<IntentResult, AgentError> {
    let trimmed = content.trim();

    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    let raw: RawIntent = serde_json::from_str(json_str).map_err(|e| AgentError::ResponseParse {
        message: format!("failed to parse classification: {e}"),
        content: content.to_string(),
    })?;

    let intent = IntentType::parse(&raw.intent_type).ok_or_else(|| AgentError::ResponseParse {
        message: format!("unknown intent '{}'", raw.intent_type),
        content: content.to_string(),
    })?;

    if intent == IntentType::OutOfScope {
        return IntentResult::new(intent, raw.confidence, Vec::<String>::new(), raw.reasoning);
    }

    let result = IntentResult::new(intent, raw.confidence, &raw.agents_to_call, &raw.reasoning)?;
    if result.agents_to_call().is_empty() {
        return IntentResult::new(
            intent,
            raw.confidence,
            intent.default_agents(),
            raw.reasoning,
        );
    }
    Ok(result)
}

/// Deterministic keyword routing used when the LLM path is unavailable.
///
/// Research, guideline and drug keywords are checked in that order against
/// the lower-cased message; the first hit decides. No hit routes to the
/// general agent.
///
/// # Errors
///
/// Never fails for the fixed values it produces; the `Result` comes from
/// [`IntentResult::new`].
pub fn keyword_route(message: &str) -> Result<IntentResult, AgentError> {
    let lower = message.to_lowercase();
    let routes = [
        (RESEARCH_KEYWORDS, IntentType::ResearchQuery, RESEARCH_AGENT),
        (GUIDELINE_KEYWORDS, IntentType::GuidelineLookup, GUIDELINE_AGENT),
        (DRUG_KEYWORDS, IntentType::DrugInfo, DRUG_AGENT),
    ];

    for (keywords, intent, agent) in routes {
        if let Some(hit) = keywords.iter().find(|k| lower.contains(*k)) {
            return IntentResult::new(
                intent,
                KEYWORD_CONFIDENCE,
                [agent],
                format!("keyword fallback: matched '{hit}'"),
            );
        }
    }

    IntentResult::new(
        IntentType::GeneralMedical,
        DEFAULT_CONFIDENCE,
        [GENERAL_AGENT],
        "keyword fallback: no keyword matched, using the general agent",
    )
}

/// Routes a pre-set structured sub-query straight to its agent.
///
/// # Errors
///
/// Never fails for the fixed values it produces; the `Result` comes from
/// [`IntentResult::new`].
pub fn route_sub_query(sub_query: &SubQuery) -> Result<IntentResult, AgentError> {
    let (intent, agent) = match sub_query {
        SubQuery::Drug { .. } => (IntentType::DrugInfo, DRUG_AGENT),
        SubQuery::Research { .. } => (IntentType::ResearchQuery, RESEARCH_AGENT),
        SubQuery::Guideline { .. } => (IntentType::GuidelineLookup, GUIDELINE_AGENT),
    };
    IntentResult::new(intent, 1.0, [agent], "pre-set sub-query")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    use test_case::test_case;

    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::prompt::CLASSIFIER_SYSTEM_PROMPT;

    struct ScriptedProvider {
        calls: Arc<AtomicU32>,
        reply: Result<String, u16>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(content) => Ok(ChatResponse {
                    content: content.clone(),
                    usage: TokenUsage::default(),
                    finish_reason: Some("stop".to_string()),
                }),
                Err(status) => Err(AgentError::ApiRequest {
                    message: "scripted failure".to_string(),
                    status: Some(*status),
                }),
            }
        }
    }

    fn classifier(reply: Result<&str, u16>) -> (IntentClassifier, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = ScriptedProvider {
            calls: Arc::clone(&calls),
            reply: reply.map(str::to_string),
        };
        let config = AgentConfig::builder()
            .max_retries(0)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let classifier = IntentClassifier::new(
            &config,
            CLASSIFIER_SYSTEM_PROMPT.to_string(),
            Some(Arc::new(provider)),
        );
        (classifier, calls)
    }

    #[test_case("" ; "empty")]
    #[test_case("   \n\t" ; "whitespace")]
    #[tokio::test]
    async fn test_empty_message_rejected_before_any_call(message: &str) {
        let (classifier, calls) = classifier(Ok("{}"));
        let result = classifier.classify(message, &[]).await;
        assert!(matches!(result, Err(AgentError::InvalidInput { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_llm_path() {
        let (classifier, calls) = classifier(Ok(
            r#"{"intent_type": "compound_query", "confidence": 0.9, "agents_to_call": ["drug_agent", "research_agent", "billing_agent"], "reasoning": "drug plus evidence"}"#,
        ));
        let result = classifier
            .classify("metformin dose and evidence", &[])
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), IntentType::CompoundQuery);
        assert_eq!(result.agents_to_call(), [DRUG_AGENT, RESEARCH_AGENT]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let (classifier, calls) = classifier(Err(400));
        let result = classifier
            .classify("¿Dosis máxima de ibuprofeno?", &[])
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), IntentType::DrugInfo);
        assert!(result.reasoning().contains("fallback"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unusable_output_falls_back() {
        let (classifier, _) = classifier(Ok(
            r#"{"intent_type": "billing", "confidence": 0.9, "reasoning": "?"}"#,
        ));
        let result = classifier
            .classify("what does the guideline say about asthma", &[])
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), IntentType::GuidelineLookup);
        assert_eq!(result.agents_to_call(), [GUIDELINE_AGENT]);
    }

    #[tokio::test]
    async fn test_no_provider_uses_keywords() {
        let config = AgentConfig::default();
        let classifier = IntentClassifier::new(&config, String::new(), None);
        assert!(!classifier.has_provider());
        let result = classifier
            .classify("warfarin interactions", &[])
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), IntentType::DrugInfo);
        assert_eq!(result.agents_to_call(), [DRUG_AGENT]);
        assert!(result.confidence() < config.low_confidence_threshold);
        assert!(result.reasoning().contains("fallback"));
    }

    #[test]
    fn test_parse_intent_code_fence() {
        let content = "```json\n{\"intent_type\": \"drug_info\", \"confidence\": 0.8, \"agents_to_call\": [\"drug_agent\"], \"reasoning\": \"dose\"}\n```";
        let result = parse_intent(content).unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), IntentType::DrugInfo);
    }

    #[test]
    fn test_parse_intent_empty_agents_use_defaults() {
        let content = r#"{"intent_type": "clinical_question", "confidence": 0.7, "agents_to_call": ["nope"], "reasoning": "case"}"#;
        let result = parse_intent(content).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            result.agents_to_call(),
            [GUIDELINE_AGENT, DRUG_AGENT, RESEARCH_AGENT]
        );
    }

    #[test]
    fn test_parse_intent_out_of_scope_calls_nobody() {
        let content = r#"{"intent_type": "out_of_scope", "confidence": 0.9, "agents_to_call": ["general_agent"], "reasoning": "pizza"}"#;
        let result = parse_intent(content).unwrap_or_else(|_| unreachable!());
        assert!(result.agents_to_call().is_empty());
    }

    #[test_case(r#"{"intent_type": "drug_info", "confidence": 1.4, "reasoning": "x"}"# ; "confidence out of range")]
    #[test_case(r#"{"intent_type": "drug_info", "confidence": 0.9, "reasoning": "  "}"# ; "blank reasoning")]
    #[test_case("not json" ; "not json")]
    fn test_parse_intent_rejects(content: &str) {
        assert!(parse_intent(content).is_err());
    }

    #[test_case("Is there a randomized trial of ibuprofen?", IntentType::ResearchQuery, RESEARCH_AGENT ; "research wins over drug")]
    #[test_case("¿Qué dice la guía sobre la dosis de metformina?", IntentType::GuidelineLookup, GUIDELINE_AGENT ; "guideline wins over drug")]
    #[test_case("Dosis de PARACETAMOL en niños", IntentType::DrugInfo, DRUG_AGENT ; "drug case insensitive")]
    #[test_case("I feel tired all the time", IntentType::GeneralMedical, GENERAL_AGENT ; "no match")]
    fn test_keyword_route(message: &str, intent: IntentType, agent: &str) {
        let result = keyword_route(message).unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), intent);
        assert_eq!(result.agents_to_call(), [agent]);
        assert!(result.confidence() < 0.6);
        assert!(result.reasoning().contains("fallback"));
    }

    #[test]
    fn test_keyword_sets_are_disjoint() {
        let research: HashSet<_> = RESEARCH_KEYWORDS.iter().collect();
        let guideline: HashSet<_> = GUIDELINE_KEYWORDS.iter().collect();
        let drug: HashSet<_> = DRUG_KEYWORDS.iter().collect();
        assert!(research.is_disjoint(&guideline));
        assert!(research.is_disjoint(&drug));
        assert!(guideline.is_disjoint(&drug));
    }

    #[test]
    fn test_route_sub_query() {
        let result = route_sub_query(&SubQuery::Guideline {
            topic: "asthma".to_string(),
            specialty: None,
        })
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(result.intent(), IntentType::GuidelineLookup);
        assert_eq!(result.agents_to_call(), [GUIDELINE_AGENT]);
        assert!((result.confidence() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_agent_properties() {
        let config = AgentConfig::default();
        let agent = ClassifierAgent::new(&config, CLASSIFIER_SYSTEM_PROMPT.to_string());
        assert_eq!(agent.role(), "classifier");
        assert!(agent.json_mode());
    }
}
