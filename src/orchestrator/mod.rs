//! Orchestrator (C9)
//!
//! Drives the mandatory tool sequence (analyze → route → format), invokes
//! the handler chosen by the classifier, assembles the final response, and
//! owns session history. Grounded on the teacher's `orchestrator/router.rs`
//! + `orchestrator/session.rs` + the step-loop shape of `agent/react.rs`,
//! but the teacher's LLM-driven ReAct loop is replaced by direct,
//! deterministic dispatch: `IntentClassifier` never needs an LLM to
//! disambiguate, so there is no "LLM driver skipped a step" case to guard
//! against here — every call populates both tool-sequence steps itself.

pub mod session;

use crate::adapters::{ObjectStoreAdapter, RelationalAdapter, VectorStoreAdapter};
use crate::capture::{ToolResultCapture, STEP_ANALYZE_QUERY, STEP_FORMAT_RESPONSE, STEP_ROUTE_TO_AGENT};
use crate::entities::{
    BatchResult, Entities, HandlerResult, HistoryItem, Intent, IntentResult, OrchestrationResponse, Query,
};
use crate::error::CoreResult;
use crate::handlers::rag_indexer::PrepareResult;
use crate::handlers::{AccumulatorHandler, DeductibleHandler, LocalDocHandler, MemberHandler, RagIndexer, RagQueryEngine};
use crate::providers::{EmbeddingProvider, FastEmbedProvider, FastRerankProvider, GenerationProvider, RerankProvider};
use crate::classifier::IntentClassifier;
use session::SessionStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Progress through the mandatory tool sequence for one `process` call,
/// derived from what's present in the capture rather than tracked
/// separately (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Analyzed,
    Routed,
    Done,
}

pub struct Orchestrator {
    classifier: IntentClassifier,
    member_handler: MemberHandler<dyn RelationalAdapter>,
    deductible_handler: DeductibleHandler<dyn RelationalAdapter>,
    accumulator_handler: AccumulatorHandler<dyn RelationalAdapter>,
    rag_indexer: RagIndexer<dyn ObjectStoreAdapter, dyn VectorStoreAdapter, dyn EmbeddingProvider>,
    rag_engine: RagQueryEngine<dyn VectorStoreAdapter, dyn EmbeddingProvider, dyn RerankProvider, dyn GenerationProvider>,
    local_doc: LocalDocHandler<dyn VectorStoreAdapter, dyn GenerationProvider>,
    sessions: SessionStore,
    rag_index_name: String,
    local_index_name: String,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        relational: Arc<dyn RelationalAdapter>,
        object_store: Arc<dyn ObjectStoreAdapter>,
        vector_store: Arc<dyn VectorStoreAdapter>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn RerankProvider>,
        generator: Arc<dyn GenerationProvider>,
        local_embedder: Arc<FastEmbedProvider>,
        local_reranker: Arc<FastRerankProvider>,
        local_doc_root: impl Into<PathBuf>,
        rag_index_name: impl Into<String>,
        local_index_name: impl Into<String>,
        max_session_history: usize,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            member_handler: MemberHandler::new(relational.clone()),
            deductible_handler: DeductibleHandler::new(relational.clone()),
            accumulator_handler: AccumulatorHandler::new(relational),
            rag_indexer: RagIndexer::new(object_store, vector_store.clone(), embedder.clone()),
            rag_engine: RagQueryEngine::new(vector_store.clone(), embedder, reranker, generator.clone()),
            local_doc: LocalDocHandler::new(local_doc_root, vector_store, local_embedder, local_reranker, generator),
            sessions: SessionStore::new(max_session_history),
            rag_index_name: rag_index_name.into(),
            local_index_name: local_index_name.into(),
        }
    }

    /// `orchestrate(prompt, session_id?, context?, preserve_history?)` (spec §6).
    pub async fn process(&self, query: Query) -> OrchestrationResponse {
        if query.prompt.trim().is_empty() {
            return OrchestrationResponse {
                success: false,
                intent: Intent::GeneralInquiry,
                agent: Intent::GeneralInquiry.agent_name().to_string(),
                confidence: 0.0,
                result: HandlerResult::General {
                    message: "validation: empty prompt".to_string(),
                    capabilities: vec![],
                },
                reasoning: "empty prompt".to_string(),
                extracted_entities: Entities::default(),
                query: query.prompt,
            };
        }

        let mut capture = ToolResultCapture::new();
        let response = self.process_inner(&query, &mut capture).await;
        capture.clear();

        if let Some(session_id) = &query.session_id {
            if query.preserve_history {
                self.sessions
                    .append(
                        session_id,
                        HistoryItem {
                            query: query.prompt.clone(),
                            intent: response.intent,
                            confidence: response.confidence,
                            agent: response.agent.clone(),
                            success: response.success,
                            timestamp: chrono::Utc::now(),
                        },
                    )
                    .await;
            }
        }

        response
    }

    /// Runs `process` under a deadline; on expiry, returns
    /// `{ success=false, error="cancelled" }` per spec §5.
    pub async fn process_with_deadline(&self, query: Query, deadline: Duration) -> OrchestrationResponse {
        match tokio::time::timeout(deadline, self.process(query.clone())).await {
            Ok(response) => response,
            Err(_) => {
                warn!(prompt = %query.prompt, "orchestrate call cancelled after deadline");
                OrchestrationResponse {
                    success: false,
                    intent: Intent::GeneralInquiry,
                    agent: Intent::GeneralInquiry.agent_name().to_string(),
                    confidence: 0.0,
                    result: HandlerResult::General {
                        message: "cancelled".to_string(),
                        capabilities: vec![],
                    },
                    reasoning: "cancelled".to_string(),
                    extracted_entities: Entities::default(),
                    query: query.prompt,
                }
            }
        }
    }

    async fn process_inner(&self, query: &Query, capture: &mut ToolResultCapture) -> OrchestrationResponse {
        // step 1: analyze_query
        let intent_result = self.classifier.classify(&query.prompt);
        capture.put(
            STEP_ANALYZE_QUERY,
            serde_json::to_value(&intent_result).unwrap_or(serde_json::Value::Null),
        );

        // step 2: route_to_agent — always invoked directly from the cached
        // analyze_query output, since this classifier never defers to an
        // LLM driver that might skip it.
        let (success, result) = self.route(&intent_result, query).await;
        capture.put(
            STEP_ROUTE_TO_AGENT,
            serde_json::json!({
                "success": success,
                "agent_name": intent_result.agent_name,
            }),
        );

        // step 3 (optional): format_response — cosmetic only.
        let display_text = Self::format_response(&result);
        capture.put(STEP_FORMAT_RESPONSE, serde_json::json!({ "display_text": display_text }));

        debug_assert!(capture.contains(STEP_ANALYZE_QUERY));
        debug_assert!(capture.contains(STEP_ROUTE_TO_AGENT));

        OrchestrationResponse {
            success,
            intent: intent_result.intent,
            agent: intent_result.agent_name.clone(),
            confidence: intent_result.confidence,
            result,
            reasoning: intent_result.reasoning,
            extracted_entities: intent_result.entities,
            query: query.prompt.clone(),
        }
    }

    async fn route(&self, intent_result: &IntentResult, query: &Query) -> (bool, HandlerResult) {
        let entities = &intent_result.entities;
        match intent_result.intent {
            Intent::MemberVerification => {
                let result = self
                    .member_handler
                    .verify(entities.member_id.as_deref(), entities.dob.as_deref(), entities.name.as_deref())
                    .await;
                let success = matches!(&result, HandlerResult::Member { valid, .. } if *valid);
                (success, result)
            }
            Intent::DeductibleOop => match &entities.member_id {
                Some(member_id) => {
                    let result = self.deductible_handler.lookup(member_id, None, None).await;
                    let success = matches!(&result, HandlerResult::Deductible { found, .. } if *found);
                    (success, result)
                }
                None => (
                    false,
                    HandlerResult::Deductible {
                        found: false,
                        member_id: String::new(),
                        individual: Default::default(),
                        family: Default::default(),
                        message: Some("missing member_id".to_string()),
                    },
                ),
            },
            Intent::BenefitAccumulator => match &entities.member_id {
                Some(member_id) => {
                    let result = self.accumulator_handler.lookup(member_id, entities.service.as_deref()).await;
                    let success = matches!(&result, HandlerResult::Accumulator { found, .. } if *found);
                    (success, result)
                }
                None => (
                    false,
                    HandlerResult::Accumulator {
                        found: false,
                        member_id: String::new(),
                        services: HashMap::new(),
                        message: Some("missing member_id".to_string()),
                    },
                ),
            },
            Intent::BenefitCoverageRag => {
                let question = entities.service.clone().unwrap_or_else(|| query.prompt.clone());
                let result = self.rag_engine.query(&question, &self.rag_index_name, 5, true).await;
                let success = matches!(&result, HandlerResult::Rag { success, .. } if *success);
                (success, result)
            }
            Intent::LocalRag => {
                let result = self.local_doc.query(&query.prompt, &self.local_index_name, 5, true).await;
                let success = matches!(&result, HandlerResult::Rag { success, .. } if *success);
                (success, result)
            }
            Intent::GeneralInquiry => (true, crate::handlers::general::respond()),
        }
    }

    /// Cosmetic formatting whose absence must not change correctness
    /// (spec §4.9). Correctness-relevant fields never read this value.
    fn format_response(result: &HandlerResult) -> String {
        match result {
            HandlerResult::Member { valid, name, .. } => match (valid, name) {
                (true, Some(n)) => format!("Member verified: {}", n),
                (true, None) => "Member verified.".to_string(),
                (false, _) => "Member not verified.".to_string(),
            },
            HandlerResult::Deductible { found, .. } => {
                if *found {
                    "Deductible/OOP figures found.".to_string()
                } else {
                    "No deductible/OOP figures found.".to_string()
                }
            }
            HandlerResult::Accumulator { found, .. } => {
                if *found {
                    "Benefit usage found.".to_string()
                } else {
                    "No benefit usage found.".to_string()
                }
            }
            HandlerResult::Rag { success, answer, .. } => {
                if *success {
                    answer.clone()
                } else {
                    "Unable to answer from available sources.".to_string()
                }
            }
            HandlerResult::General { message, .. } => message.clone(),
        }
    }

    /// `orchestrate_batch(prompts, context?)` (spec §6). Session-less
    /// unless a `Query` in the batch carries its own `session_id`.
    pub async fn orchestrate_batch(&self, queries: Vec<Query>) -> BatchResult {
        let mut results = Vec::with_capacity(queries.len());
        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut intents: HashMap<Intent, u32> = HashMap::new();

        for query in queries {
            let response = self.process(query).await;
            if response.success {
                successful += 1;
            } else {
                failed += 1;
            }
            *intents.entry(response.intent).or_insert(0) += 1;
            results.push(response);
        }

        let total = results.len();
        BatchResult { results, total, successful, failed, intents }
    }

    pub async fn history(&self, session_id: &str) -> Vec<HistoryItem> {
        self.sessions.history(session_id).await
    }

    pub async fn clear_history(&self, session_id: &str) {
        self.sessions.clear(session_id).await;
    }

    /// Thin passthrough (spec §6).
    pub async fn verify(&self, member_id: Option<&str>, dob: Option<&str>, name: Option<&str>) -> HandlerResult {
        self.member_handler.verify(member_id, dob, name).await
    }

    /// Thin passthrough (spec §6).
    pub async fn lookup_deductible(&self, member_id: &str, plan_type: Option<&str>, network: Option<&str>) -> HandlerResult {
        self.deductible_handler.lookup(member_id, plan_type, network).await
    }

    /// Thin passthrough (spec §6).
    pub async fn lookup_accumulator(&self, member_id: &str, service: Option<&str>) -> HandlerResult {
        self.accumulator_handler.lookup(member_id, service).await
    }

    /// Thin passthrough (spec §6).
    pub async fn rag_query(&self, question: &str, index_name: &str, k: usize) -> HandlerResult {
        self.rag_engine.query(question, index_name, k, true).await
    }

    /// Thin passthrough (spec §6). Idempotent by construction: vector
    /// store upserts are commutative over the deterministic chunk ids.
    pub async fn rag_prepare(&self, prefix: &str, chunk_size: usize, chunk_overlap: usize) -> CoreResult<PrepareResult> {
        info!(prefix, index = %self.rag_index_name, "preparing rag index");
        self.rag_indexer.prepare("bucket", prefix, &self.rag_index_name, chunk_size, chunk_overlap).await
    }

    pub async fn local_doc_prepare(&self, prefix: &str, chunk_size: usize, chunk_overlap: usize) -> CoreResult<PrepareResult> {
        self.local_doc.prepare(prefix, &self.local_index_name, chunk_size, chunk_overlap).await
    }
}
