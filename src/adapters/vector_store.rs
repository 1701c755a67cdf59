//! VectorStoreAdapter — Chroma-backed
//!
//! Grounded on the teacher's `memory/vector.rs` (`VectorMemory`), which
//! embeds and searches in-process; this adapter keeps the same
//! `Arc<RwLock<_>>`-wrapped-client shape but delegates storage and
//! similarity search to a real Chroma collection instead of a hand-rolled
//! dot-product scan, since the teacher's Cargo.toml already depends on
//! `chromadb` for exactly this purpose elsewhere in the crate.

use crate::entities::ChunkMetadata;
use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use chromadb::client::{ChromaClient, ChromaClientOptions};
use chromadb::collection::{ChromaCollection, CollectionEntries, GetOptions, QueryOptions};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
}

impl DistanceMetric {
    fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
        }
    }
}

/// A single embedding plus its flattened chunk payload, keyed by a
/// deterministic content-derived id (spec §4.5 step 6).
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

#[async_trait]
pub trait VectorStoreAdapter: Send + Sync {
    async fn ensure_collection(&self, name: &str, dim: usize, metric: DistanceMetric) -> CoreResult<()>;
    async fn upsert(&self, name: &str, points: Vec<VectorPoint>) -> CoreResult<()>;
    async fn search(&self, name: &str, vector: &[f32], k: usize) -> CoreResult<Vec<VectorHit>>;

    /// Liveness check surfaced by the Health endpoint (spec §6).
    async fn is_initialized(&self) -> bool;
}

pub struct ChromaVectorStore {
    client: Arc<RwLock<ChromaClient>>,
    /// Memoizes dimensions already validated against Chroma this process,
    /// so repeated `ensure_collection` calls for the same name don't
    /// re-probe every time. Starts empty on every process start, so it is
    /// never itself treated as ground truth for a *new* name — the first
    /// call for any name always probes the collection's actual stored
    /// vectors (spec §4.5 step 6).
    validated_dims: RwLock<std::collections::HashMap<String, usize>>,
}

impl ChromaVectorStore {
    pub async fn connect(url: &str) -> CoreResult<Self> {
        let client = ChromaClient::new(ChromaClientOptions {
            url: Some(url.to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;
        Ok(Self {
            client: Arc::new(RwLock::new(client)),
            validated_dims: RwLock::new(std::collections::HashMap::new()),
        })
    }

    /// Reads the dimension of a vector already stored in `collection`, if
    /// any, by fetching one existing point's embedding. Returns `None` for
    /// an empty collection (nothing to compare against yet — its
    /// dimension is effectively being established by this call).
    async fn probe_stored_dimension(&self, collection: &ChromaCollection) -> CoreResult<Option<usize>> {
        let count = collection
            .count()
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;
        if count == 0 {
            return Ok(None);
        }

        let result = collection
            .get(GetOptions {
                ids: None,
                where_metadata: None,
                limit: Some(1),
                offset: None,
                where_document: None,
                include: Some(vec!["embeddings"]),
            })
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;

        Ok(result.embeddings.and_then(|vectors| vectors.into_iter().next()).map(|v| v.len()))
    }

    fn chunk_metadata_to_map(meta: &ChunkMetadata) -> Value {
        json!({
            "source": meta.source,
            "page": meta.page,
            "section_title": meta.section_title,
            "benefit_category": meta.benefit_category,
            "coverage_type": meta.coverage_type,
            "cpt_codes": meta.cpt_codes,
            "has_cost_info": meta.has_cost_info,
            "has_tables": meta.has_tables,
            "content_text": meta.content_text,
        })
    }

    fn map_to_chunk_metadata(value: &Value) -> ChunkMetadata {
        ChunkMetadata {
            content_text: value
                .get("content_text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source: value
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            page: value.get("page").and_then(Value::as_u64).unwrap_or(0) as u32,
            section_title: value
                .get("section_title")
                .and_then(Value::as_str)
                .map(str::to_string),
            benefit_category: value
                .get("benefit_category")
                .and_then(Value::as_str)
                .map(str::to_string),
            coverage_type: value
                .get("coverage_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            cpt_codes: value
                .get("cpt_codes")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            has_cost_info: value.get("has_cost_info").and_then(Value::as_bool).unwrap_or(false),
            has_tables: value.get("has_tables").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

#[async_trait]
impl VectorStoreAdapter for ChromaVectorStore {
    async fn ensure_collection(&self, name: &str, dim: usize, metric: DistanceMetric) -> CoreResult<()> {
        {
            let validated = self.validated_dims.read().await;
            if let Some(existing) = validated.get(name) {
                if *existing != dim {
                    return Err(CoreError::Validation(format!(
                        "collection {} already exists with dimension {}, requested {}",
                        name, existing, dim
                    )));
                }
                return Ok(());
            }
        }

        let client = self.client.read().await;
        let collection = client
            .get_or_create_collection(
                name,
                Some(json!({ "hnsw:space": metric.as_str() }).as_object().unwrap().clone()),
            )
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;

        // The in-process cache above is empty on every process start, so a
        // collection created by a prior run is indistinguishable from a
        // brand-new one until probed: fetch its actual stored dimension
        // before trusting `dim` (spec §4.5 step 6 / §9 dimension-coupling
        // note).
        if let Some(actual_dim) = self.probe_stored_dimension(&collection).await? {
            if actual_dim != dim {
                return Err(CoreError::IntegrationPermanent(format!(
                    "collection {} already contains {}-dim vectors, requested {}",
                    name, actual_dim, dim
                )));
            }
        }

        self.validated_dims.write().await.insert(name.to_string(), dim);
        Ok(())
    }

    async fn upsert(&self, name: &str, points: Vec<VectorPoint>) -> CoreResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let client = self.client.read().await;
        let collection = client
            .get_or_create_collection(name, None)
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;

        let ids: Vec<String> = points.iter().map(|p| p.id.clone()).collect();
        let embeddings: Vec<Vec<f32>> = points.iter().map(|p| p.vector.clone()).collect();
        let metadatas: Vec<std::collections::HashMap<String, Value>> = points
            .iter()
            .map(|p| {
                Self::chunk_metadata_to_map(&p.metadata)
                    .as_object()
                    .unwrap()
                    .clone()
                    .into_iter()
                    .collect()
            })
            .collect();
        let documents: Vec<String> = points.iter().map(|p| p.metadata.content_text.clone()).collect();

        let entries = CollectionEntries {
            ids: ids.iter().map(String::as_str).collect(),
            embeddings: Some(embeddings),
            metadatas: Some(metadatas),
            documents: Some(documents.iter().map(String::as_str).collect()),
        };

        collection
            .upsert(entries, None)
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, name: &str, vector: &[f32], k: usize) -> CoreResult<Vec<VectorHit>> {
        let client = self.client.read().await;
        let collection = client
            .get_or_create_collection(name, None)
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;

        let query = QueryOptions {
            query_embeddings: Some(vec![vector.to_vec()]),
            n_results: Some(k),
            where_metadata: None,
            where_document: None,
            include: Some(vec!["metadatas", "distances", "documents"]),
        };

        let result = collection
            .query(query, None)
            .await
            .map_err(|e| CoreError::IntegrationTransient(e.to_string()))?;

        let ids = result.ids.into_iter().next().unwrap_or_default();
        let distances = result.distances.unwrap_or_default().into_iter().next().unwrap_or_default();
        let metadatas = result.metadatas.unwrap_or_default().into_iter().next().unwrap_or_default();

        let hits = ids
            .into_iter()
            .zip(distances)
            .zip(metadatas)
            .map(|((id, distance), meta)| {
                let meta_value = meta.map(|m| Value::Object(m.into_iter().collect())).unwrap_or(Value::Null);
                VectorHit {
                    id,
                    score: 1.0 - distance,
                    metadata: Self::map_to_chunk_metadata(&meta_value),
                }
            })
            .collect();

        Ok(hits)
    }

    async fn is_initialized(&self) -> bool {
        let client = self.client.read().await;
        client.get_or_create_collection("__health__", None).await.is_ok()
    }
}
