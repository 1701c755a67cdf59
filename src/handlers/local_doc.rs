//! LocalDocHandler (C7)
//!
//! Same contract as RAGIndexer+RAGQueryEngine (C5/C6), but the page JSON
//! lives on local disk rather than a remote object store, and embedding +
//! reranking run in-process via `fastembed` instead of a remote provider
//! (spec §4.7). Reuses `LocalObjectStore` for the filesystem read path —
//! the object-store *interface* is still the right seam even though there
//! is no remote object store behind it here.

use crate::adapters::object_store::LocalObjectStore;
use crate::adapters::VectorStoreAdapter;
use crate::entities::HandlerResult;
use crate::handlers::rag_indexer::{PrepareResult, RagIndexer};
use crate::handlers::rag_query::RagQueryEngine;
use crate::providers::{FastEmbedProvider, FastRerankProvider, GenerationProvider};
use std::sync::Arc;

pub struct LocalDocHandler<V, G>
where
    V: VectorStoreAdapter + ?Sized,
    G: GenerationProvider + ?Sized,
{
    indexer: RagIndexer<LocalObjectStore, V, FastEmbedProvider>,
    query_engine: RagQueryEngine<V, FastEmbedProvider, FastRerankProvider, G>,
}

impl<V, G> LocalDocHandler<V, G>
where
    V: VectorStoreAdapter + ?Sized,
    G: GenerationProvider + ?Sized,
{
    pub fn new(
        local_root: impl Into<std::path::PathBuf>,
        vector_store: Arc<V>,
        embedder: Arc<FastEmbedProvider>,
        reranker: Arc<FastRerankProvider>,
        generator: Arc<G>,
    ) -> Self {
        let object_store = Arc::new(LocalObjectStore::new(local_root));
        Self {
            indexer: RagIndexer::new(object_store, vector_store.clone(), embedder.clone()),
            query_engine: RagQueryEngine::new(vector_store, embedder, reranker, generator),
        }
    }

    pub async fn prepare(&self, prefix: &str, index_name: &str, chunk_size: usize, chunk_overlap: usize) -> crate::error::CoreResult<PrepareResult> {
        self.indexer.prepare("local", prefix, index_name, chunk_size, chunk_overlap).await
    }

    pub async fn query(&self, question: &str, index_name: &str, k: usize, use_reranker: bool) -> HandlerResult {
        self.query_engine.query(question, index_name, k, use_reranker).await
    }
}
