//! EmbeddingProvider — remote HTTP or local `fastembed` (C5/C6/C7 step 5/1)

use crate::error::{CoreError, CoreResult};
use crate::retry::retry_with_backoff;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

/// The character cap content is truncated to before embedding (spec §4.5
/// step 5, documented rather than silently enforced elsewhere).
pub const EMBEDDING_CHAR_CAP: usize = 8000;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
}

/// Calls a remote embedding endpoint, used by RAGIndexer/RAGQueryEngine
/// (C5/C6) where documents live in the object store rather than locally.
/// Grounded on the teacher's `OpenAICompatibleProvider` request shape.
pub struct RemoteEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseItem>,
}

impl RemoteEmbeddingProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        let truncated: Vec<String> = texts
            .iter()
            .map(|t| t.chars().take(EMBEDDING_CHAR_CAP).collect())
            .collect();

        let vectors = retry_with_backoff(|| async {
            let body = json!({
                "model": self.model,
                "input": &truncated,
            });

            let mut request = self
                .client
                .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
                .json(&body);
            if let Some(ref key) = self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await.map_err(CoreError::from)?;
            let response = response.error_for_status().map_err(CoreError::from)?;
            let parsed: EmbeddingResponse = response.json().await.map_err(CoreError::from)?;
            Ok(parsed.data.into_iter().map(|item| item.embedding).collect::<Vec<Vec<f32>>>())
        })
        .await?;

        for v in &vectors {
            if v.len() != self.dimension {
                return Err(CoreError::IntegrationPermanent(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    v.len()
                )));
            }
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Native output dimension of `EmbeddingModel::AllMiniLML6V2`, the model
/// `FastEmbedProvider` wraps. Callers that want a local embedder must ask
/// for this dimension; anything else fails fast in `try_new` rather than
/// being silently corrected (spec §9).
pub const LOCAL_EMBEDDING_DIMENSION: usize = 384;

/// Local in-process embedding for LocalDocHandler (C7), matching the
/// teacher's `memory/vector.rs` `VectorMemory::embed`.
pub struct FastEmbedProvider {
    embedder: Mutex<TextEmbedding>,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Constructs the local embedder and probes its actual output
    /// dimension with a single embedding call (spec §9: "validated against
    /// a single probe embedding before `prepare` proceeds"). `AllMiniLML6V2`
    /// is fixed at 384 dimensions regardless of what configuration asks
    /// for; a mismatch against the requested `dimension` fails fast here
    /// rather than silently tagging 384-dim vectors with the wrong number.
    pub fn try_new(dimension: usize) -> CoreResult<Self> {
        let embedder = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|e| CoreError::Internal(format!("failed to initialize local embedding model: {}", e)))?;

        let probe = embedder
            .embed(vec!["dimension probe".to_string()], None)
            .map_err(|e| CoreError::Internal(format!("local embedding probe failed: {}", e)))?;
        let actual_dimension = probe
            .first()
            .ok_or_else(|| CoreError::Internal("local embedding probe returned no vectors".to_string()))?
            .len();
        if actual_dimension != dimension {
            return Err(CoreError::IntegrationPermanent(format!(
                "local embedding dimension mismatch: configured {}, model actually produces {}",
                dimension, actual_dimension
            )));
        }

        Ok(Self {
            embedder: Mutex::new(embedder),
            dimension: actual_dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        let truncated: Vec<String> = texts
            .iter()
            .map(|t| t.chars().take(EMBEDDING_CHAR_CAP).collect())
            .collect();
        let embedder = self.embedder.lock().await;
        let vectors = embedder
            .embed(truncated, None)
            .map_err(|e| CoreError::Internal(format!("local embedding failed: {}", e)))?;

        for v in &vectors {
            if v.len() != self.dimension {
                return Err(CoreError::IntegrationPermanent(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    v.len()
                )));
            }
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
