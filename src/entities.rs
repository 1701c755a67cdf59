//! Core data model
//!
//! Transient request/response shapes and the handler result union. Follows
//! the teacher's convention (`memory/entry.rs`, `agent/react.rs`) of plain
//! serde-derived structs with small constructor/builder helpers rather than
//! a derive-everything approach.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of intents a query can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    MemberVerification,
    DeductibleOop,
    BenefitAccumulator,
    BenefitCoverageRag,
    LocalRag,
    GeneralInquiry,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::MemberVerification,
        Intent::DeductibleOop,
        Intent::BenefitAccumulator,
        Intent::BenefitCoverageRag,
        Intent::LocalRag,
        Intent::GeneralInquiry,
    ];

    /// The handler name surfaced in provenance, matching spec's
    /// `agent_name` / `agent` field.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Intent::MemberVerification => "MemberHandler",
            Intent::DeductibleOop => "DeductibleHandler",
            Intent::BenefitAccumulator => "AccumulatorHandler",
            Intent::BenefitCoverageRag => "RAGQueryEngine",
            Intent::LocalRag => "LocalDocHandler",
            Intent::GeneralInquiry => "OrchestrationAgent",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intent::MemberVerification => "member_verification",
            Intent::DeductibleOop => "deductible_oop",
            Intent::BenefitAccumulator => "benefit_accumulator",
            Intent::BenefitCoverageRag => "benefit_coverage_rag",
            Intent::LocalRag => "local_rag",
            Intent::GeneralInquiry => "general_inquiry",
        };
        write!(f, "{}", s)
    }
}

/// A query type inferred from keyword groups, used both for classification
/// and for shaping handler calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Status,
    Coverage,
    UsageCount,
    Financial,
    General,
}

/// Entities extracted from free text by the classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    pub member_id: Option<String>,
    pub dob: Option<String>,
    pub name: Option<String>,
    pub service: Option<String>,
    pub query_type: Option<QueryType>,
}

impl Entities {
    pub fn count(&self) -> usize {
        [
            self.member_id.is_some(),
            self.dob.is_some(),
            self.name.is_some(),
            self.service.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }
}

/// A transient free-text request. Owned by the Orchestrator for the
/// duration of one call to `process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub prompt: String,
    pub session_id: Option<String>,
    pub context: Option<HashMap<String, String>>,
    pub preserve_history: bool,
}

impl Query {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: None,
            context: None,
            preserve_history: true,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn without_history(mut self) -> Self {
        self.preserve_history = false;
        self
    }
}

/// Output of the IntentClassifier (C1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub agent_name: String,
    pub confidence: f32,
    pub reasoning: String,
    pub entities: Entities,
    pub pattern_matches: HashMap<Intent, u32>,
    pub fallback_intent: Intent,
}

/// A single plan×network metric bundle (4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deductible: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deductible_met: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deductible_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oop: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oop_met: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oop_remaining: Option<i64>,
}

impl MetricSet {
    pub fn is_empty(&self) -> bool {
        self.deductible.is_none()
            && self.deductible_met.is_none()
            && self.deductible_remaining.is_none()
            && self.oop.is_none()
            && self.oop_met.is_none()
            && self.oop_remaining.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanBucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppo: Option<MetricSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub par: Option<MetricSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oon: Option<MetricSet>,
}

/// A retrieved/reranked document reference returned alongside a RAG answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSource {
    pub source_id: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

/// The tagged union of handler-specific results (spec 3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum HandlerResult {
    Member {
        valid: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        member_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dob: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Deductible {
        found: bool,
        member_id: String,
        individual: PlanBucket,
        family: PlanBucket,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Accumulator {
        found: bool,
        member_id: String,
        services: HashMap<String, AccumulatorMetric>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Rag {
        success: bool,
        answer: String,
        sources: Vec<RagSource>,
        question: String,
        retrieved_docs_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    General {
        message: String,
        capabilities: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulatorMetric {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

/// Result of dispatching to a handler (spec 3.1 RoutingResult).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    pub success: bool,
    pub intent: Intent,
    pub agent_name: String,
    pub result: HandlerResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The final, fully-assembled response of one `orchestrate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResponse {
    pub success: bool,
    pub intent: Intent,
    pub agent: String,
    pub confidence: f32,
    pub result: HandlerResult,
    pub reasoning: String,
    pub extracted_entities: Entities,
    pub query: String,
}

/// A chunk of page text produced by adaptive chunking (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content_text: String,
    pub source: String,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefit_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_type: Option<String>,
    pub cpt_codes: Vec<String>,
    pub has_cost_info: bool,
    pub has_tables: bool,
}

/// Flattened chunk payload stored alongside each vector (spec 3.1 VectorPoint).
pub type ChunkMetadata = Chunk;

/// A single historical request/response pair, process-local and bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub query: String,
    pub intent: Intent,
    pub confidence: f32,
    pub agent: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Result of `orchestrate_batch` (spec §6). Batch items are session-less
/// unless each `Query` in the batch carries its own `session_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<OrchestrationResponse>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub intents: HashMap<Intent, u32>,
}
