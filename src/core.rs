//! Core façade
//!
//! Wires C1–C10 together for embedding in a binary or service, mirroring
//! the teacher's top-level wiring in `main.rs` (there: `VectorMemory` +
//! `ToolRegistry` + `Supervisor` constructed once at startup and shared via
//! `Arc`). `Core::health()` matches spec §6's Health endpoint shape: one
//! liveness boolean plus a per-adapter initialized flag.

use crate::adapters::{ChromaVectorStore, LocalObjectStore, ObjectStoreAdapter, PgRelationalAdapter, RelationalAdapter, VectorStoreAdapter};
use crate::config::AppConfig;
use crate::error::CoreResult;
use crate::orchestrator::Orchestrator;
use crate::providers::{FastEmbedProvider, FastRerankProvider, OpenAICompatibleGenerationProvider, RemoteEmbeddingProvider, RemoteRerankProvider};
use serde::Serialize;
use std::sync::Arc;

const RAG_INDEX_NAME: &str = "benefit_coverage";
const LOCAL_INDEX_NAME: &str = "local_documents";
const REMOTE_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const REMOTE_RERANK_MODEL: &str = "rerank-english-v3.0";

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub live: bool,
    pub relational_initialized: bool,
    pub object_store_initialized: bool,
    pub vector_store_initialized: bool,
}

/// Top-level wiring of every component behind one handle, constructed once
/// per process and shared via `Arc` by whatever transport layer the
/// implementer chooses (spec §1 — HTTP binding stays out of scope here).
pub struct Core {
    pub orchestrator: Orchestrator,
    relational: Arc<PgRelationalAdapter>,
    object_store: Arc<LocalObjectStore>,
    vector_store: Arc<ChromaVectorStore>,
}

impl Core {
    pub async fn from_config(config: &AppConfig) -> CoreResult<Self> {
        let relational = Arc::new(PgRelationalAdapter::connect(&config.database_url).await?);
        let object_store = Arc::new(LocalObjectStore::new(&config.object_store_root));
        let vector_store = Arc::new(ChromaVectorStore::connect("http://localhost:8000").await?);

        let embedder: Arc<dyn crate::providers::EmbeddingProvider> = match &config.embedding_provider_url {
            Some(url) => Arc::new(RemoteEmbeddingProvider::new(
                url.clone(),
                config.provider_api_key.clone(),
                REMOTE_EMBEDDING_MODEL,
                config.embedding_dimension,
            )),
            // Falling back to the local model when no remote embedding URL is
            // configured only makes sense at the local model's own native
            // dimension (spec §9: fail fast on a dimension mismatch rather
            // than silently using whatever `config.embedding_dimension` asks
            // for a different provider).
            None => Arc::new(FastEmbedProvider::try_new(crate::providers::LOCAL_EMBEDDING_DIMENSION)?),
        };
        let reranker: Arc<dyn crate::providers::RerankProvider> = match &config.rerank_provider_url {
            Some(url) => Arc::new(RemoteRerankProvider::new(url.clone(), config.provider_api_key.clone(), REMOTE_RERANK_MODEL)),
            None => Arc::new(FastRerankProvider::try_new()?),
        };
        let generator: Arc<dyn crate::providers::GenerationProvider> = Arc::new(OpenAICompatibleGenerationProvider::new(
            config.generation_provider_url.clone().unwrap_or_else(|| "http://localhost:8080/v1".to_string()),
            config.provider_api_key.clone(),
        ));

        let local_embedder = Arc::new(FastEmbedProvider::try_new(crate::providers::LOCAL_EMBEDDING_DIMENSION)?);
        let local_reranker = Arc::new(FastRerankProvider::try_new()?);

        let orchestrator = Orchestrator::new(
            relational.clone(),
            object_store.clone(),
            vector_store.clone(),
            embedder,
            reranker,
            generator,
            local_embedder,
            local_reranker,
            format!("{}/local_docs", config.object_store_root),
            RAG_INDEX_NAME,
            LOCAL_INDEX_NAME,
            config.max_session_history,
        );

        Ok(Self { orchestrator, relational, object_store, vector_store })
    }

    /// Health endpoint: overall liveness plus a per-adapter initialized flag.
    pub async fn health(&self) -> HealthReport {
        let relational_initialized = self.relational.is_initialized().await;
        let object_store_initialized = self.object_store.is_initialized().await;
        let vector_store_initialized = self.vector_store.is_initialized().await;
        HealthReport {
            live: true,
            relational_initialized,
            object_store_initialized,
            vector_store_initialized,
        }
    }
}
