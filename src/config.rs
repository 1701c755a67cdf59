//! Configuration
//!
//! Loads process environment (optionally via a `.env` file) into a typed
//! `AppConfig`, the same shape as the teacher's `AgencyConfig` in
//! `main.rs` but covering the adapters and providers this core depends on.

use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string for the relational adapter.
    pub database_url: String,
    /// Root directory for the local object store.
    pub object_store_root: String,
    /// Base URL of the remote embedding provider.
    pub embedding_provider_url: Option<String>,
    /// Base URL of the remote rerank provider.
    pub rerank_provider_url: Option<String>,
    /// Base URL of the remote generation (LLM) provider.
    pub generation_provider_url: Option<String>,
    /// API key shared by the remote providers, if any.
    pub provider_api_key: Option<String>,
    /// Dimension of vectors stored in the vector collection.
    pub embedding_dimension: usize,
    /// Max session-history entries retained per session id.
    pub max_session_history: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/mba".to_string(),
            object_store_root: "./object_store".to_string(),
            embedding_provider_url: None,
            rerank_provider_url: None,
            generation_provider_url: None,
            provider_api_key: None,
            embedding_dimension: 1024,
            max_session_history: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, falling back to
    /// defaults for anything unset. Mirrors the teacher's pattern of
    /// calling `dotenv().ok()` once at process start and reading `env::var`
    /// thereafter.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("MBA_DATABASE_URL").unwrap_or(defaults.database_url),
            object_store_root: env::var("MBA_OBJECT_STORE_ROOT")
                .unwrap_or(defaults.object_store_root),
            embedding_provider_url: env::var("MBA_EMBEDDING_URL").ok(),
            rerank_provider_url: env::var("MBA_RERANK_URL").ok(),
            generation_provider_url: env::var("MBA_GENERATION_URL").ok(),
            provider_api_key: env::var("MBA_PROVIDER_API_KEY").ok(),
            embedding_dimension: env::var("MBA_EMBEDDING_DIM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.embedding_dimension),
            max_session_history: env::var("MBA_MAX_SESSION_HISTORY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_session_history),
        }
    }
}
