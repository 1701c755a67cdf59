//! Generation / embedding / rerank provider plumbing.
//!
//! Grounded on the teacher's `agent/provider.rs` (`LLMProvider`,
//! `OpenAICompatibleProvider`) and `memory/vector.rs` (`fastembed`-backed
//! embedding) — generalized into three narrow trait seams instead of one
//! do-everything `LLMProvider`, since RAGQueryEngine (C6) and LocalDocHandler
//! (C7) need independently swappable embedding/rerank/generation backends.

pub mod embedding;
pub mod llm;
pub mod rerank;

pub use embedding::{EmbeddingProvider, FastEmbedProvider, RemoteEmbeddingProvider, LOCAL_EMBEDDING_DIMENSION};
pub use llm::{GenerationProvider, OpenAICompatibleGenerationProvider};
pub use rerank::{FastRerankProvider, RemoteRerankProvider, RerankProvider};
