//! RerankProvider — remote HTTP or local `fastembed` cross-encoder (C6/C7 step 3)

use crate::error::{CoreError, CoreResult};
use crate::retry::retry_with_backoff;
use async_trait::async_trait;
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

/// A reranked candidate: its original index into the input `documents`
/// slice plus the relevance score assigned by the cross-encoder.
#[derive(Debug, Clone)]
pub struct RerankHit {
    pub index: usize,
    pub score: f32,
}

#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Reorders `documents` by relevance to `query` and returns the top
    /// `top_k` hits, highest score first.
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize) -> CoreResult<Vec<RerankHit>>;
}

#[derive(Deserialize)]
struct RemoteRerankItem {
    index: usize,
    relevance_score: f32,
}

#[derive(Deserialize)]
struct RemoteRerankResponse {
    results: Vec<RemoteRerankItem>,
}

pub struct RemoteRerankProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl RemoteRerankProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl RerankProvider for RemoteRerankProvider {
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize) -> CoreResult<Vec<RerankHit>> {
        let parsed: RemoteRerankResponse = retry_with_backoff(|| async {
            let body = json!({
                "model": self.model,
                "query": query,
                "documents": documents,
                "top_n": top_k,
            });

            let mut request = self
                .client
                .post(format!("{}/rerank", self.base_url.trim_end_matches('/')))
                .json(&body);
            if let Some(ref key) = self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await.map_err(CoreError::from)?;
            let response = response.error_for_status().map_err(CoreError::from)?;
            response.json().await.map_err(CoreError::from)
        })
        .await?;

        let mut hits: Vec<RerankHit> = parsed
            .results
            .into_iter()
            .map(|item| RerankHit {
                index: item.index,
                score: item.relevance_score,
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Local cross-encoder reranking for LocalDocHandler (C7).
pub struct FastRerankProvider {
    reranker: Mutex<TextRerank>,
}

impl FastRerankProvider {
    pub fn try_new() -> CoreResult<Self> {
        let reranker = TextRerank::try_new(
            RerankInitOptions::new(RerankerModel::BGERerankerBase).with_show_download_progress(false),
        )
        .map_err(|e| CoreError::Internal(format!("failed to initialize local rerank model: {}", e)))?;
        Ok(Self {
            reranker: Mutex::new(reranker),
        })
    }
}

#[async_trait]
impl RerankProvider for FastRerankProvider {
    async fn rerank(&self, query: &str, documents: &[String], top_k: usize) -> CoreResult<Vec<RerankHit>> {
        let doc_refs: Vec<&str> = documents.iter().map(String::as_str).collect();
        let reranker = self.reranker.lock().await;
        let results = reranker
            .rerank(query, doc_refs, false, None)
            .map_err(|e| CoreError::Internal(format!("local rerank failed: {}", e)))?;

        let mut hits: Vec<RerankHit> = results
            .into_iter()
            .map(|r| RerankHit {
                index: r.index,
                score: r.score,
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}
