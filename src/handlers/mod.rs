//! Handlers (C2-C7)
//!
//! One module per handler, each taking its adapters/providers by `Arc` and
//! exposing a narrow async method that returns a `HandlerResult`. Mirrors
//! the teacher's `tools/mod.rs` `Tool` trait impls: small, independently
//! testable units composed by the orchestrator rather than inheriting from
//! a shared base type.

pub mod accumulator;
pub mod deductible;
pub mod general;
pub mod local_doc;
pub mod member;
pub mod rag_common;
pub mod rag_indexer;
pub mod rag_query;

pub use accumulator::AccumulatorHandler;
pub use deductible::DeductibleHandler;
pub use local_doc::LocalDocHandler;
pub use member::MemberHandler;
pub use rag_indexer::RagIndexer;
pub use rag_query::RagQueryEngine;
