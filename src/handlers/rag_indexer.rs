//! RAGIndexer (C5)

use crate::adapters::object_store::{is_skipped_filename, page_number};
use crate::adapters::vector_store::{DistanceMetric, VectorPoint};
use crate::adapters::{ObjectStoreAdapter, VectorStoreAdapter};
use crate::error::{CoreError, CoreResult};
use crate::handlers::rag_common::{chunk_document, deterministic_chunk_id, extract_page_text, PageDocument};
use crate::providers::EmbeddingProvider;
use std::sync::Arc;
use tracing::{info, warn};

pub struct PrepareResult {
    pub success: bool,
    pub chunks_count: usize,
    pub doc_count: usize,
    pub index_name: String,
}

pub struct RagIndexer<O, V, E>
where
    O: ObjectStoreAdapter + ?Sized,
    V: VectorStoreAdapter + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    object_store: Arc<O>,
    vector_store: Arc<V>,
    embedder: Arc<E>,
}

impl<O, V, E> RagIndexer<O, V, E>
where
    O: ObjectStoreAdapter + ?Sized,
    V: VectorStoreAdapter + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    pub fn new(object_store: Arc<O>, vector_store: Arc<V>, embedder: Arc<E>) -> Self {
        Self {
            object_store,
            vector_store,
            embedder,
        }
    }

    /// Lists `prefix` one delimiter deep; if it directly contains page
    /// files, returns them. Otherwise, if exactly one subdirectory
    /// contains page files, descends into it. Fails with `NotFound`
    /// (the typed `NoPageFiles` condition) otherwise (spec §4.5 step 1).
    async fn discover_page_keys(&self, prefix: &str) -> CoreResult<Vec<String>> {
        let entries = self.object_store.list(prefix, Some("/")).await?;
        let direct_pages: Vec<String> = entries
            .iter()
            .filter(|k| !k.ends_with('/'))
            .filter(|k| page_number(k).is_some())
            .cloned()
            .collect();
        if !direct_pages.is_empty() {
            return Ok(direct_pages);
        }

        let subdirs: Vec<&String> = entries.iter().filter(|k| k.ends_with('/')).collect();
        let mut candidates = Vec::new();
        for subdir in subdirs {
            let children = self.object_store.list(subdir, None).await?;
            let pages: Vec<String> = children
                .into_iter()
                .filter(|k| {
                    let filename = k.rsplit('/').next().unwrap_or(k);
                    !is_skipped_filename(filename) && page_number(k).is_some()
                })
                .collect();
            if !pages.is_empty() {
                candidates.push(pages);
            }
        }

        match candidates.len() {
            1 => Ok(candidates.into_iter().next().unwrap()),
            0 => Err(CoreError::NotFound(format!("no page files found under prefix {}", prefix))),
            _ => Err(CoreError::Validation(format!(
                "ambiguous job directory under prefix {}: multiple subdirectories contain page files",
                prefix
            ))),
        }
    }

    /// `chunk_size` is the base target (in characters) that the adaptive
    /// chunker in `rag_common::target_size_for` scales per content type
    /// (spec §4.5 step 3 / §6, default 1000). `chunk_overlap` is part of
    /// the API for interface parity with the source, but the chunking
    /// algorithm never implements it (spec §4.5 step 3/§9). Rather than
    /// silently ignoring a caller-supplied value, a non-zero overlap is
    /// rejected outright.
    pub async fn prepare(
        &self,
        _bucket: &str,
        prefix: &str,
        index_name: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> CoreResult<PrepareResult> {
        if chunk_overlap != 0 {
            return Err(CoreError::Validation(format!(
                "chunk_overlap is not implemented; expected 0, got {}",
                chunk_overlap
            )));
        }
        if chunk_size == 0 {
            return Err(CoreError::Validation("chunk_size must be greater than 0".to_string()));
        }

        let page_keys = self.discover_page_keys(prefix).await?;

        let mut all_chunks = Vec::new();
        let mut doc_count = 0usize;
        for key in &page_keys {
            let page_num = match page_number(key) {
                Some(n) => n,
                None => continue,
            };
            let bytes = self.object_store.get(key).await?;
            let page: PageDocument = serde_json::from_slice(&bytes)
                .map_err(|e| CoreError::Validation(format!("malformed page json {}: {}", key, e)))?;
            let extracted = extract_page_text(&page);
            doc_count += 1;

            let chunks = chunk_document(&extracted.text, key, page_num, extracted.has_tables, chunk_size, chunk_overlap);
            all_chunks.extend(chunks);
        }

        if all_chunks.is_empty() {
            info!(prefix, "no chunks produced from discovered pages");
            return Ok(PrepareResult {
                success: true,
                chunks_count: 0,
                doc_count,
                index_name: index_name.to_string(),
            });
        }

        let texts: Vec<String> = all_chunks.iter().map(|c| c.content_text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await.map_err(|e| {
            warn!(error = %e, "embedding failed during rag_prepare");
            e
        })?;

        let dim = self.embedder.dimension();
        self.vector_store
            .ensure_collection(index_name, dim, DistanceMetric::Cosine)
            .await?;

        let points: Vec<VectorPoint> = all_chunks
            .into_iter()
            .zip(vectors.into_iter())
            .map(|(chunk, vector)| VectorPoint {
                id: deterministic_chunk_id(&chunk.content_text),
                vector,
                metadata: chunk,
            })
            .collect();

        let chunks_count = points.len();
        self.vector_store.upsert(index_name, points).await?;

        Ok(PrepareResult {
            success: true,
            chunks_count,
            doc_count,
            index_name: index_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::vector_store::VectorHit;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeObjectStore {
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl ObjectStoreAdapter for FakeObjectStore {
        async fn list(&self, prefix: &str, delimiter: Option<&str>) -> CoreResult<Vec<String>> {
            let prefix = prefix.trim_end_matches('/');
            let mut seen_dirs = std::collections::HashSet::new();
            let mut keys = Vec::new();
            for key in self.files.keys() {
                if let Some(rest) = key.strip_prefix(prefix).and_then(|r| r.strip_prefix('/')) {
                    if delimiter.is_some() && rest.contains('/') {
                        let dir = rest.split('/').next().unwrap();
                        if seen_dirs.insert(dir.to_string()) {
                            keys.push(format!("{}/{}/", prefix, dir));
                        }
                    } else {
                        keys.push(key.clone());
                    }
                }
            }
            keys.sort();
            Ok(keys)
        }

        async fn get(&self, key: &str) -> CoreResult<Vec<u8>> {
            self.files
                .get(key)
                .cloned()
                .ok_or_else(|| CoreError::NotFound(key.to_string()))
        }

        async fn put(&self, _key: &str, _bytes: &[u8], _metadata: Option<HashMap<String, String>>) -> CoreResult<()> {
            Ok(())
        }

        async fn is_initialized(&self) -> bool {
            true
        }
    }

    struct FakeVectorStore {
        upserted: StdMutex<usize>,
    }

    #[async_trait]
    impl VectorStoreAdapter for FakeVectorStore {
        async fn ensure_collection(&self, _name: &str, _dim: usize, _metric: DistanceMetric) -> CoreResult<()> {
            Ok(())
        }

        async fn upsert(&self, _name: &str, points: Vec<VectorPoint>) -> CoreResult<()> {
            *self.upserted.lock().unwrap() += points.len();
            Ok(())
        }

        async fn search(&self, _name: &str, _vector: &[f32], _k: usize) -> CoreResult<Vec<VectorHit>> {
            Ok(vec![])
        }

        async fn is_initialized(&self) -> bool {
            true
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn page_json(lines: &[&str]) -> Vec<u8> {
        let blocks: Vec<_> = lines
            .iter()
            .map(|l| serde_json::json!({"BlockType": "LINE", "Text": l, "Id": "b1"}))
            .collect();
        serde_json::to_vec(&serde_json::json!({ "Blocks": blocks })).unwrap()
    }

    #[tokio::test]
    async fn discovers_pages_directly_under_prefix() {
        let mut files = HashMap::new();
        files.insert(
            "docs/page_0001.json".to_string(),
            page_json(&["Massage therapy is covered under the PPO plan for eligible members today."]),
        );
        let indexer = RagIndexer::new(
            Arc::new(FakeObjectStore { files }),
            Arc::new(FakeVectorStore { upserted: StdMutex::new(0) }),
            Arc::new(FakeEmbedder),
        );
        let result = indexer.prepare("bucket", "docs", "benefits", 1000, 0).await.unwrap();
        assert!(result.success);
        assert_eq!(result.doc_count, 1);
        assert!(result.chunks_count >= 1);
    }

    #[tokio::test]
    async fn descends_into_single_job_subdirectory() {
        let mut files = HashMap::new();
        files.insert(
            "docs/job-123/page_0001.json".to_string(),
            page_json(&["Acupuncture requires prior authorization before the visit is covered."]),
        );
        let indexer = RagIndexer::new(
            Arc::new(FakeObjectStore { files }),
            Arc::new(FakeVectorStore { upserted: StdMutex::new(0) }),
            Arc::new(FakeEmbedder),
        );
        let result = indexer.prepare("bucket", "docs", "benefits", 1000, 0).await.unwrap();
        assert_eq!(result.doc_count, 1);
    }

    #[tokio::test]
    async fn no_page_files_is_not_found() {
        let indexer = RagIndexer::new(
            Arc::new(FakeObjectStore { files: HashMap::new() }),
            Arc::new(FakeVectorStore { upserted: StdMutex::new(0) }),
            Arc::new(FakeEmbedder),
        );
        let err = indexer.prepare("bucket", "docs", "benefits", 1000, 0).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn nonzero_chunk_overlap_is_rejected_rather_than_silently_ignored() {
        let indexer = RagIndexer::new(
            Arc::new(FakeObjectStore { files: HashMap::new() }),
            Arc::new(FakeVectorStore { upserted: StdMutex::new(0) }),
            Arc::new(FakeEmbedder),
        );
        let err = indexer.prepare("bucket", "docs", "benefits", 1000, 200).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected() {
        let indexer = RagIndexer::new(
            Arc::new(FakeObjectStore { files: HashMap::new() }),
            Arc::new(FakeVectorStore { upserted: StdMutex::new(0) }),
            Arc::new(FakeEmbedder),
        );
        let err = indexer.prepare("bucket", "docs", "benefits", 0, 0).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Validation);
    }
}
