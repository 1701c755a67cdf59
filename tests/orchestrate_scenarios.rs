//! End-to-end scenarios exercised through `Orchestrator`, using in-memory
//! fakes for the three adapters and the three providers (the teacher never
//! hits live infra in its own `tests/e2e_scenarios.rs` either — it swaps in
//! a `SmartMockProvider`; this does the analogous thing for every seam).

use async_trait::async_trait;
use mba_orchestrator_core::adapters::vector_store::{DistanceMetric, VectorHit, VectorPoint};
use mba_orchestrator_core::adapters::{ObjectStoreAdapter, RelationalAdapter, VectorStoreAdapter};
use mba_orchestrator_core::entities::{Chunk, HandlerResult, Intent, Query};
use mba_orchestrator_core::error::CoreResult;
use mba_orchestrator_core::orchestrator::Orchestrator;
use mba_orchestrator_core::providers::rerank::RerankHit;
use mba_orchestrator_core::providers::{
    EmbeddingProvider, FastEmbedProvider, FastRerankProvider, GenerationProvider, RerankProvider, LOCAL_EMBEDDING_DIMENSION,
};
use std::collections::HashMap;
use std::sync::Arc;

// ── fakes ───────────────────────────────────────────────────────────────

struct FakeRelational {
    rows: Vec<mba_orchestrator_core::adapters::relational::Row>,
}

#[async_trait]
impl RelationalAdapter for FakeRelational {
    async fn query_with_strings(&self, _sql: &str, _params: &[String]) -> CoreResult<Vec<mba_orchestrator_core::adapters::relational::Row>> {
        Ok(self.rows.clone())
    }
    async fn is_initialized(&self) -> bool {
        true
    }
}

fn row(pairs: &[(&str, &str)]) -> mba_orchestrator_core::adapters::relational::Row {
    let mut columns = HashMap::new();
    for (k, v) in pairs {
        columns.insert(k.to_string(), Some(v.to_string()));
    }
    mba_orchestrator_core::adapters::relational::Row { columns }
}

struct EmptyObjectStore;
#[async_trait]
impl ObjectStoreAdapter for EmptyObjectStore {
    async fn list(&self, _prefix: &str, _delimiter: Option<&str>) -> CoreResult<Vec<String>> {
        Ok(vec![])
    }
    async fn get(&self, key: &str) -> CoreResult<Vec<u8>> {
        Err(mba_orchestrator_core::error::CoreError::NotFound(key.to_string()))
    }
    async fn put(&self, _key: &str, _bytes: &[u8], _metadata: Option<HashMap<String, String>>) -> CoreResult<()> {
        Ok(())
    }
    async fn is_initialized(&self) -> bool {
        true
    }
}

/// One fixed document chunk, returned regardless of the query vector, so
/// `benefit_coverage_rag` scenarios always have a candidate to rerank.
struct SingleDocVectorStore;
#[async_trait]
impl VectorStoreAdapter for SingleDocVectorStore {
    async fn ensure_collection(&self, _name: &str, _dim: usize, _metric: DistanceMetric) -> CoreResult<()> {
        Ok(())
    }
    async fn upsert(&self, _name: &str, _points: Vec<VectorPoint>) -> CoreResult<()> {
        Ok(())
    }
    async fn search(&self, _name: &str, _vector: &[f32], k: usize) -> CoreResult<Vec<VectorHit>> {
        Ok(vec![VectorHit {
            id: "chunk-1".to_string(),
            score: 0.9,
            metadata: Chunk {
                content_text: "Acupuncture is covered under the PPO plan with prior authorization.".to_string(),
                source: "policy/page_0003.json".to_string(),
                page: 3,
                section_title: None,
                benefit_category: Some("therapy".to_string()),
                coverage_type: Some("prior_auth_required".to_string()),
                cpt_codes: vec![],
                has_cost_info: false,
                has_tables: false,
            },
        }]
        .into_iter()
        .take(k.max(1))
        .collect())
    }
    async fn is_initialized(&self) -> bool {
        true
    }
}

struct FakeEmbedder;
#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
    }
    fn dimension(&self) -> usize {
        2
    }
}

struct FakeReranker;
#[async_trait]
impl RerankProvider for FakeReranker {
    async fn rerank(&self, _query: &str, documents: &[String], top_k: usize) -> CoreResult<Vec<RerankHit>> {
        Ok((0..documents.len().min(top_k.max(1)))
            .map(|i| RerankHit { index: i, score: 1.0 - i as f32 * 0.1 })
            .collect())
    }
}

struct FakeGenerator;
#[async_trait]
impl GenerationProvider for FakeGenerator {
    async fn generate(&self, _model: &str, _prompt: &str, _system: Option<&str>, _temp: f32, _max: u32) -> CoreResult<String> {
        Ok("Acupuncture is covered under the PPO plan, subject to prior authorization.".to_string())
    }
}

fn build_orchestrator(rows: Vec<mba_orchestrator_core::adapters::relational::Row>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(FakeRelational { rows }),
        Arc::new(EmptyObjectStore),
        Arc::new(SingleDocVectorStore),
        Arc::new(FakeEmbedder),
        Arc::new(FakeReranker),
        Arc::new(FakeGenerator),
        Arc::new(FastEmbedProvider::try_new(LOCAL_EMBEDDING_DIMENSION).expect("local embedding model")),
        Arc::new(FastRerankProvider::try_new().expect("local rerank model")),
        "./target/tmp_local_docs",
        "benefits",
        "local",
        50,
    )
}

// ── scenario 1: member verification ────────────────────────────────────

#[tokio::test]
async fn scenario_member_verification_returns_matched_member() {
    let orchestrator = build_orchestrator(vec![row(&[
        ("member_id", "M1001"),
        ("first_name", "Brandi"),
        ("last_name", "Kim"),
        ("dob", "2005-05-23"),
    ])]);

    let response = orchestrator.process(Query::new("Is member M1001 active?")).await;

    assert_eq!(response.intent, Intent::MemberVerification);
    assert_eq!(response.agent, "MemberHandler");
    assert!(response.confidence >= 0.5);
    match response.result {
        HandlerResult::Member { valid, member_id, name, dob, .. } => {
            assert!(valid);
            assert_eq!(member_id.as_deref(), Some("M1001"));
            assert_eq!(name.as_deref(), Some("Brandi Kim"));
            assert_eq!(dob.as_deref(), Some("2005-05-23"));
        }
        _ => panic!("expected Member variant"),
    }
}

// ── scenario 2: deductible/oop lookup with computed remaining ──────────

#[tokio::test]
async fn scenario_deductible_lookup_computes_remaining() {
    let orchestrator = build_orchestrator(vec![
        row(&[("metric", "Deductible IND PPO"), ("value", "2683")]),
        row(&[("metric", "Deductible IND PPO Met"), ("value", "1840")]),
        row(&[("metric", "OOP IND PPO"), ("value", "1120")]),
        row(&[("metric", "OOP IND PPO Met"), ("value", "495")]),
    ]);

    let response = orchestrator.process(Query::new("What is the deductible for member M1001?")).await;

    assert_eq!(response.intent, Intent::DeductibleOop);
    match response.result {
        HandlerResult::Deductible { found, individual, .. } => {
            assert!(found);
            let ppo = individual.ppo.expect("ppo bucket present");
            assert_eq!(ppo.deductible, Some(2683));
            assert_eq!(ppo.deductible_met, Some(1840));
            assert_eq!(ppo.deductible_remaining, Some(843));
            assert_eq!(ppo.oop, Some(1120));
            assert_eq!(ppo.oop_met, Some(495));
            assert_eq!(ppo.oop_remaining, Some(625));
        }
        _ => panic!("expected Deductible variant"),
    }
}

// ── scenario 3: benefit accumulator usage ──────────────────────────────

#[tokio::test]
async fn scenario_accumulator_lookup_reports_remaining_usage() {
    let orchestrator = build_orchestrator(vec![
        row(&[("metric", "Massage Therapy Used"), ("value", "4")]),
        row(&[("metric", "Massage Therapy Limit"), ("value", "12")]),
    ]);

    let response = orchestrator
        .process(Query::new("How many massage therapy visits has member M1001 used?"))
        .await;

    assert_eq!(response.intent, Intent::BenefitAccumulator);
    match response.result {
        HandlerResult::Accumulator { found, services, .. } => {
            assert!(found);
            let metric = services.get("Massage Therapy").expect("service present");
            assert_eq!(metric.used, 4);
            assert_eq!(metric.limit, 12);
            assert_eq!(metric.remaining, 8);
        }
        _ => panic!("expected Accumulator variant"),
    }
}

// ── scenario 4: benefit coverage RAG ────────────────────────────────────

#[tokio::test]
async fn scenario_coverage_rag_returns_sourced_answer() {
    let orchestrator = build_orchestrator(vec![]);

    let response = orchestrator.process(Query::new("Is acupuncture covered?")).await;

    assert_eq!(response.intent, Intent::BenefitCoverageRag);
    match response.result {
        HandlerResult::Rag { success, answer, sources, .. } => {
            assert!(success);
            assert!(!answer.is_empty());
            assert!(!sources.is_empty());
            assert_eq!(sources[0].metadata.source, "policy/page_0003.json");
        }
        _ => panic!("expected Rag variant"),
    }
}

// ── scenario 5: general inquiry ────────────────────────────────────────

#[tokio::test]
async fn scenario_general_inquiry_returns_capabilities() {
    let orchestrator = build_orchestrator(vec![]);

    let response = orchestrator.process(Query::new("Hello")).await;

    assert_eq!(response.intent, Intent::GeneralInquiry);
    assert_eq!(response.agent, "OrchestrationAgent");
    assert!(response.success);
    match response.result {
        HandlerResult::General { message, capabilities } => {
            assert!(!message.is_empty());
            assert!(!capabilities.is_empty());
        }
        _ => panic!("expected General variant"),
    }
}

// ── scenario 6: session history round-trip ─────────────────────────────

#[tokio::test]
async fn scenario_history_reflects_last_orchestrate_call() {
    let orchestrator = build_orchestrator(vec![row(&[
        ("member_id", "M1001"),
        ("first_name", "Brandi"),
        ("last_name", "Kim"),
        ("dob", "2005-05-23"),
    ])]);

    orchestrator
        .process(Query::new("Is member M1001 active?").with_session("s1"))
        .await;

    let history = orchestrator.history("s1").await;
    let last = history.last().expect("history has an entry");
    assert_eq!(last.intent, Intent::MemberVerification);
    assert!(last.success);
    assert_eq!(last.query, "Is member M1001 active?");

    orchestrator.clear_history("s1").await;
    assert!(orchestrator.history("s1").await.is_empty());
}

// ── boundary behaviors ──────────────────────────────────────────────────

#[tokio::test]
async fn empty_and_whitespace_prompts_are_validation_failures() {
    let orchestrator = build_orchestrator(vec![]);
    for prompt in ["", "   ", "\t\n"] {
        let response = orchestrator.process(Query::new(prompt)).await;
        assert!(!response.success);
    }
}

#[tokio::test]
async fn unknown_member_id_is_not_valid() {
    let orchestrator = build_orchestrator(vec![]);
    let response = orchestrator.process(Query::new("Is member M9999 active?")).await;
    match response.result {
        HandlerResult::Member { valid, message, .. } => {
            assert!(!valid);
            assert_eq!(message.as_deref(), Some("authentication failed"));
        }
        _ => panic!("expected Member variant"),
    }
}

#[tokio::test]
async fn deductible_query_without_member_id_is_validation_failure() {
    let orchestrator = build_orchestrator(vec![]);
    let response = orchestrator.process(Query::new("What is the deductible?")).await;
    assert_eq!(response.intent, Intent::DeductibleOop);
    assert!(!response.success);
}
