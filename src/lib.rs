//! Medical Benefits Administration orchestration core
//!
//! Classifies free-text member queries into a fixed intent taxonomy,
//! routes each to exactly one of six handlers, and returns a typed result
//! together with structured provenance (intent, confidence, handler name,
//! reasoning, extracted entities). Also carries a retrieval-augmented
//! generation indexer and query path for benefit-coverage documentation.
//!
//! HTTP binding, file upload, CSV ingestion, the UI/CLI shell, and the
//! embedding/rerank/generation model providers themselves stay external
//! collaborators reached through trait objects (`adapters`, `providers`).

pub mod adapters;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod core;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod providers;
pub mod retry;

pub use classifier::IntentClassifier;
pub use config::AppConfig;
pub use core::Core;
pub use entities::{BatchResult, HandlerResult, HistoryItem, Intent, OrchestrationResponse, Query};
pub use error::{CoreError, CoreResult};
pub use orchestrator::Orchestrator;
