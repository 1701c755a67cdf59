//! RAGQueryEngine (C6)

use crate::adapters::VectorStoreAdapter;
use crate::entities::{HandlerResult, RagSource};
use crate::providers::{EmbeddingProvider, GenerationProvider, RerankProvider};
use std::sync::Arc;

const CANDIDATE_CAP: usize = 50;
const SOURCE_CONTENT_TRUNCATE: usize = 500;
const GENERATION_TEMPERATURE: f32 = 0.3;
const GENERATION_MAX_TOKENS: u32 = 2000;
const GENERATION_MODEL: &str = "grounded-answer";

const PROMPT_PREAMBLE: &str = "Answer the question using only the information in the numbered sources below. \
If the sources do not contain the answer, say so explicitly. Cite sources by their number.";

pub struct RagQueryEngine<V, E, R, G>
where
    V: VectorStoreAdapter + ?Sized,
    E: EmbeddingProvider + ?Sized,
    R: RerankProvider + ?Sized,
    G: GenerationProvider + ?Sized,
{
    vector_store: Arc<V>,
    embedder: Arc<E>,
    reranker: Arc<R>,
    generator: Arc<G>,
}

impl<V, E, R, G> RagQueryEngine<V, E, R, G>
where
    V: VectorStoreAdapter + ?Sized,
    E: EmbeddingProvider + ?Sized,
    R: RerankProvider + ?Sized,
    G: GenerationProvider + ?Sized,
{
    pub fn new(vector_store: Arc<V>, embedder: Arc<E>, reranker: Arc<R>, generator: Arc<G>) -> Self {
        Self {
            vector_store,
            embedder,
            reranker,
            generator,
        }
    }

    fn build_prompt(question: &str, sources: &[RagSource]) -> String {
        let mut body = String::new();
        for source in sources {
            body.push_str(&format!("[Source {}]\n{}\n\n", source.source_id, source.content));
        }
        format!("{}\n\n{}\nQuestion: {}", PROMPT_PREAMBLE, body, question)
    }

    pub async fn query(&self, question: &str, index_name: &str, k: usize, use_reranker: bool) -> HandlerResult {
        let embedding = match self.embedder.embed(&[question.to_string()]).await {
            Ok(mut v) => v.remove(0),
            Err(e) => {
                return HandlerResult::Rag {
                    success: false,
                    answer: String::new(),
                    sources: vec![],
                    question: question.to_string(),
                    retrieved_docs_count: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        let candidate_k = (2 * k).min(CANDIDATE_CAP).max(k);
        let hits = match self.vector_store.search(index_name, &embedding, candidate_k).await {
            Ok(hits) => hits,
            Err(e) => {
                return HandlerResult::Rag {
                    success: false,
                    answer: String::new(),
                    sources: vec![],
                    question: question.to_string(),
                    retrieved_docs_count: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        let retrieved_docs_count = hits.len();

        let mut sources: Vec<RagSource> = if use_reranker && !hits.is_empty() {
            let documents: Vec<String> = hits.iter().map(|h| h.metadata.content_text.clone()).collect();
            match self.reranker.rerank(question, &documents, k).await {
                Ok(rerank_hits) => rerank_hits
                    .into_iter()
                    .enumerate()
                    .map(|(i, rh)| {
                        let hit = &hits[rh.index];
                        RagSource {
                            source_id: i + 1,
                            content: truncate(&hit.metadata.content_text, SOURCE_CONTENT_TRUNCATE),
                            metadata: hit.metadata.clone(),
                            similarity: Some(hit.score),
                            rerank_score: Some(rh.score),
                        }
                    })
                    .collect(),
                Err(e) => {
                    return HandlerResult::Rag {
                        success: false,
                        answer: String::new(),
                        sources: vec![],
                        question: question.to_string(),
                        retrieved_docs_count,
                        error: Some(e.to_string()),
                    }
                }
            }
        } else {
            hits.into_iter()
                .take(k)
                .enumerate()
                .map(|(i, hit)| RagSource {
                    source_id: i + 1,
                    content: truncate(&hit.metadata.content_text, SOURCE_CONTENT_TRUNCATE),
                    metadata: hit.metadata,
                    similarity: Some(hit.score),
                    rerank_score: None,
                })
                .collect()
        };
        sources.truncate(k);

        let prompt = Self::build_prompt(question, &sources);
        match self
            .generator
            .generate(GENERATION_MODEL, &prompt, None, GENERATION_TEMPERATURE, GENERATION_MAX_TOKENS)
            .await
        {
            Ok(answer) => HandlerResult::Rag {
                success: true,
                answer,
                sources,
                question: question.to_string(),
                retrieved_docs_count,
                error: None,
            },
            Err(e) => HandlerResult::Rag {
                success: false,
                answer: String::new(),
                sources,
                question: question.to_string(),
                retrieved_docs_count,
                error: Some(e.to_string()),
            },
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
