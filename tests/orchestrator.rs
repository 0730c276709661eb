//! End-to-end tests of the orchestrator with mock agents and a mock LLM.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use medroute::agent::{
    AgentConfig, AgentRegistry, ChatRequest, ChatResponse, DomainAgent, FnAgent, LlmProvider,
    Locale, Orchestrator, RetryConfig, RetryExecutor, TokenUsage,
};
use medroute::core::{
    AgentReply, DRUG_AGENT, Document, FinalResponse, GUIDELINE_AGENT, IntentType, Message,
    OutcomeStatus, Query, RESEARCH_AGENT,
};
use medroute::error::{AgentError, ServiceError};

/// Answers classifier calls (JSON mode) and composer calls from scripts.
struct MockLlm {
    intent_json: Result<String, u16>,
    composed: Option<String>,
    classifier_calls: AtomicU32,
    composer_calls: AtomicU32,
}

impl MockLlm {
    fn new(intent_json: Result<&str, u16>, composed: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            intent_json: intent_json.map(str::to_string),
            composed: composed.map(str::to_string),
            classifier_calls: AtomicU32::new(0),
            composer_calls: AtomicU32::new(0),
        })
    }
}

fn reply(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage::default(),
        finish_reason: Some("stop".to_string()),
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        if request.json_mode {
            self.classifier_calls.fetch_add(1, Ordering::SeqCst);
            return match &self.intent_json {
                Ok(json) => Ok(reply(json)),
                Err(status) => Err(AgentError::ApiRequest {
                    message: "mock classifier failure".to_string(),
                    status: Some(*status),
                }),
            };
        }
        self.composer_calls.fetch_add(1, Ordering::SeqCst);
        match &self.composed {
            Some(text) => Ok(reply(text)),
            None => Err(AgentError::ApiRequest {
                message: "mock composer failure".to_string(),
                status: Some(400),
            }),
        }
    }
}

fn cited_agent(name: &'static str, text: &'static str, doc: &'static str) -> Arc<dyn DomainAgent> {
    Arc::new(FnAgent::new(name, move |_q: Query| async move {
        Ok(AgentReply {
            response_text: text.to_string(),
            documents: vec![Document::new(name, doc)],
        })
    }))
}

fn config(locale: Locale) -> AgentConfig {
    AgentConfig::builder()
        .locale(locale)
        .max_retries(1)
        .agent_timeout(Duration::from_secs(2))
        .build()
        .unwrap_or_else(|_| unreachable!())
}

fn compound_registry() -> AgentRegistry {
    AgentRegistry::new()
        .with(cited_agent(
            DRUG_AGENT,
            "Ibuprofen 400 mg [1], max 1200 mg OTC [2].\n\nReferences\n[1] Label\n[2] BNF",
            "drug-1",
        ))
        .and_then(|r| {
            r.with(cited_agent(
                RESEARCH_AGENT,
                "Trial A [1], trial B [2], review C [3].\n\nReferences\n[1] A\n[2] B\n[3] C",
                "pmid-1",
            ))
        })
        .unwrap_or_else(|_| unreachable!())
}

const COMPOUND_JSON: &str = r#"{"intent_type": "compound_query", "confidence": 0.91,
    "agents_to_call": ["drug_agent", "research_agent"], "reasoning": "dose plus evidence"}"#;

#[tokio::test]
async fn test_llm_routed_request_is_composed() {
    let llm = MockLlm::new(
        Ok(COMPOUND_JSON),
        Some("Ibuprofen 400 mg is standard [1][2]; trials agree [3][4][5]."),
    );
    let orchestrator = Orchestrator::new(
        &config(Locale::En),
        Some(llm.clone() as Arc<dyn LlmProvider>),
        compound_registry(),
    );

    let response = orchestrator
        .handle_message("ibuprofen dose and evidence", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.intent.intent(), IntentType::CompoundQuery);
    assert_eq!(response.references, ["Label", "BNF", "A", "B", "C"]);
    assert!(response.text.starts_with("Ibuprofen 400 mg is standard [1][2]"));
    assert!(response.text.ends_with("References\n[1] Label\n[2] BNF\n[3] A\n[4] B\n[5] C"));
    assert_eq!(llm.classifier_calls.load(Ordering::SeqCst), 1);
    assert_eq!(llm.composer_calls.load(Ordering::SeqCst), 1);

    let agents: Vec<&str> = response.agents.iter().map(|a| a.agent.as_str()).collect();
    assert_eq!(agents, [DRUG_AGENT, RESEARCH_AGENT]);
    let docs: Vec<&str> = response.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(docs, ["drug-1", "pmid-1"]);
}

#[tokio::test]
async fn test_composer_failure_falls_back_to_sections() {
    let llm = MockLlm::new(Ok(COMPOUND_JSON), None);
    let orchestrator = Orchestrator::new(
        &config(Locale::En),
        Some(llm.clone() as Arc<dyn LlmProvider>),
        compound_registry(),
    );

    let response = orchestrator
        .handle_message("ibuprofen dose and evidence", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(response.text.contains("## Drug information"));
    assert!(response.text.contains("Trial A [3], trial B [4], review C [5]."));
    assert_eq!(response.references.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_classifier_outage_uses_keyword_fallback() {
    let llm = MockLlm::new(Err(503), None);
    let registry = AgentRegistry::new()
        .with(cited_agent(
            DRUG_AGENT,
            "Max 4 g/day [1].\nReferences\n[1] Label",
            "d",
        ))
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = Orchestrator::new(
        &config(Locale::En),
        Some(llm.clone() as Arc<dyn LlmProvider>),
        registry,
    );

    let response = orchestrator
        .handle_message("paracetamol maximum dose", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());

    // One retry on the transient 503, then the keyword route.
    assert_eq!(llm.classifier_calls.load(Ordering::SeqCst), 2);
    assert_eq!(response.intent.intent(), IntentType::DrugInfo);
    assert!(response.intent.reasoning().contains("fallback"));
    assert!(response.intent.confidence() < 0.6);
    assert_eq!(response.references, ["Label"]);
}

/// Guideline agent that overruns, drug agent that answers in Spanish,
/// research agent that fails permanently.
fn degrading_registry() -> AgentRegistry {
    let slow: Arc<dyn DomainAgent> = Arc::new(FnAgent::new(GUIDELINE_AGENT, |_q: Query| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(AgentReply::text("never seen"))
    }));
    let broken: Arc<dyn DomainAgent> = Arc::new(FnAgent::new(RESEARCH_AGENT, |_q: Query| async {
        Err(AgentError::Service(ServiceError::Validation {
            url: "https://pubmed.example".to_string(),
            message: "bad term".to_string(),
        }))
    }));
    AgentRegistry::new()
        .with(slow)
        .and_then(|r| {
            r.with(cited_agent(
                DRUG_AGENT,
                "Usar IECA con precaución [1].\nReferencias\n[1] Ficha técnica",
                "d",
            ))
        })
        .and_then(|r| r.with(broken))
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test(start_paused = true)]
async fn test_slow_and_failing_agents_degrade_independently() {
    let clinical = r#"{"intent_type": "clinical_question", "confidence": 0.8,
        "agents_to_call": ["guideline_agent", "drug_agent", "research_agent"],
        "reasoning": "patient case"}"#;
    let llm = MockLlm::new(Ok(clinical), None);
    let orchestrator = Orchestrator::new(
        &config(Locale::Es),
        Some(llm as Arc<dyn LlmProvider>),
        degrading_registry(),
    );

    let started = tokio::time::Instant::now();
    let response = orchestrator
        .handle_message("paciente con HTA, ¿qué tratamiento?", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());
    let elapsed = started.elapsed();

    let statuses: Vec<OutcomeStatus> = response.agents.iter().map(|a| a.status).collect();
    assert_eq!(
        statuses,
        [
            OutcomeStatus::TimedOut,
            OutcomeStatus::Ok,
            OutcomeStatus::Failed
        ]
    );
    assert!(elapsed < Duration::from_secs(3));
    assert!(response.text.contains("no respondió dentro de su límite"));
    assert!(response.text.contains("no está disponible temporalmente"));
    assert!(response.text.contains("Nota terminológica"));
    assert!(response.text.ends_with("Referencias\n[1] Ficha técnica"));
    assert_eq!(response.degraded_agents().count(), 2);
}

#[tokio::test]
async fn test_out_of_scope_calls_no_agent() {
    let json = r#"{"intent_type": "out_of_scope", "confidence": 0.97,
        "agents_to_call": ["general_agent"], "reasoning": "weather"}"#;
    let llm = MockLlm::new(Ok(json), None);
    let orchestrator = Orchestrator::new(
        &config(Locale::En),
        Some(llm as Arc<dyn LlmProvider>),
        compound_registry(),
    );

    let response = orchestrator
        .handle_message("what's the weather tomorrow?", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.intent.intent(), IntentType::OutOfScope);
    assert!(response.intent.agents_to_call().is_empty());
    assert!(response.text.contains("outside the medical topics"));
    assert!(response.references.is_empty());
    assert!(response.documents.is_empty());
}

#[tokio::test]
async fn test_history_and_prior_documents_flow_through() {
    let seen_history = Arc::new(AtomicU32::new(0));
    let probe = Arc::clone(&seen_history);
    let agent: Arc<dyn DomainAgent> = Arc::new(FnAgent::new(DRUG_AGENT, move |q: Query| {
        let probe = Arc::clone(&probe);
        async move {
            probe.store(u32::try_from(q.history.len()).unwrap_or(0), Ordering::SeqCst);
            Ok(AgentReply {
                response_text: "Adjust the dose [1].\nReferences\n[1] Renal guide".to_string(),
                documents: vec![Document::new("drugdb", "turn-2")],
            })
        }
    }));
    let registry = AgentRegistry::new()
        .with(agent)
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = Orchestrator::new(&config(Locale::En), None, registry);

    let query = Query::new("and the metformin dose in renal failure?")
        .with_history(vec![
            Message::user("metformin dose?"),
            Message::assistant("500 mg twice daily [1]."),
        ])
        .with_prior_documents(vec![Document::new("drugdb", "turn-1")]);
    let response = orchestrator
        .handle(query)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(seen_history.load(Ordering::SeqCst), 2);
    let docs: Vec<&str> = response.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(docs, ["turn-1", "turn-2"]);
}

#[tokio::test]
async fn test_blank_messages_are_rejected() {
    let orchestrator = Orchestrator::new(&config(Locale::En), None, AgentRegistry::new());
    for text in ["", " \n\t "] {
        assert!(matches!(
            orchestrator.handle_message(text, Vec::new()).await,
            Err(AgentError::InvalidInput { .. })
        ));
    }
}

/// Drug agent whose backend always answers with the same service error.
struct FlakyBackendAgent {
    retry: RetryExecutor,
    error: ServiceError,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl DomainAgent for FlakyBackendAgent {
    fn name(&self) -> &str {
        DRUG_AGENT
    }

    async fn run(&self, _query: Query) -> Result<AgentReply, AgentError> {
        let text: String = self
            .retry
            .execute(|| {
                let calls = Arc::clone(&self.calls);
                let error = self.error.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<String, _>(AgentError::Service(error))
                }
            })
            .await?;
        Ok(AgentReply::text(text))
    }
}

async fn ask_flaky_backend(error: ServiceError) -> (u32, FinalResponse) {
    let calls = Arc::new(AtomicU32::new(0));
    let retry = RetryConfig::new(
        2,
        Duration::from_millis(10),
        Duration::from_millis(100),
        false,
        2.0,
    )
    .unwrap_or_else(|_| unreachable!());
    let agent: Arc<dyn DomainAgent> = Arc::new(FlakyBackendAgent {
        retry: RetryExecutor::new(retry),
        error,
        calls: Arc::clone(&calls),
    });
    let registry = AgentRegistry::new()
        .with(agent)
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = Orchestrator::new(&config(Locale::En), None, registry);

    let response = orchestrator
        .handle_message("paracetamol maximum dose", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());
    (calls.load(Ordering::SeqCst), response)
}

#[tokio::test(start_paused = true)]
async fn test_transient_backend_errors_are_retried_then_degraded() {
    let (calls, response) = ask_flaky_backend(ServiceError::Server {
        url: "https://drugs.example/api".to_string(),
        status: 503,
        message: "unavailable".to_string(),
    })
    .await;

    assert_eq!(calls, 3);
    assert_eq!(response.agents.len(), 1);
    assert_eq!(response.agents[0].status, OutcomeStatus::Failed);
    assert!(
        response.agents[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("drugs.example"))
    );
    assert!(response.text.contains("temporarily unavailable"));
    assert!(response.references.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_permanent_backend_errors_degrade_after_one_call() {
    for error in [
        ServiceError::Validation {
            url: "https://drugs.example/api".to_string(),
            message: "unknown drug".to_string(),
        },
        ServiceError::Other {
            message: "unexpected payload".to_string(),
        },
    ] {
        let (calls, response) = ask_flaky_backend(error).await;
        assert_eq!(calls, 1);
        assert_eq!(response.agents[0].status, OutcomeStatus::Failed);
        assert!(response.text.contains("temporarily unavailable"));
    }
}

#[tokio::test]
async fn test_disclaimer_after_reference_block_keeps_global_numbering() {
    let llm = MockLlm::new(Ok(COMPOUND_JSON), None);
    let registry = AgentRegistry::new()
        .with(cited_agent(
            DRUG_AGENT,
            "Dose 400 mg [1], max [2].\n\nReferences\n[1] Label\n[2] BNF\n\nConsult your physician.",
            "drug-1",
        ))
        .and_then(|r| {
            r.with(cited_agent(
                RESEARCH_AGENT,
                "Trial [1].\n\nReferences\n[1] RCT",
                "pmid-1",
            ))
        })
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = Orchestrator::new(
        &config(Locale::En),
        Some(llm as Arc<dyn LlmProvider>),
        registry,
    );

    let response = orchestrator
        .handle_message("ibuprofen dose and evidence", Vec::new())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(response.references, ["Label", "BNF", "RCT"]);
    assert!(response.text.contains("Consult your physician."));
    assert!(response.text.contains("Trial [3]."));
    assert_eq!(response.text.matches("References").count(), 1);
}
