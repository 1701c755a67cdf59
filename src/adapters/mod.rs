//! DataAdapters (C10)
//!
//! Narrow trait-object interfaces over the three resources handlers depend
//! on. Each is a leaf dependency handlers take by `Arc<dyn Trait>` and never
//! share mutable state, matching the teacher's `Arc<dyn LLMProvider>` /
//! `Arc<dyn Memory>` convention in `agent/react.rs`.

pub mod object_store;
pub mod relational;
pub mod vector_store;

pub use object_store::{LocalObjectStore, ObjectStoreAdapter};
pub use relational::{PgRelationalAdapter, RelationalAdapter, Row};
pub use vector_store::{ChromaVectorStore, DistanceMetric, VectorHit, VectorPoint, VectorStoreAdapter};

/// The identifier allow-list used whenever a member id is interpolated as a
/// SQL column name for a transposed wide table (spec §4.3/§4.10/§9).
pub fn is_safe_identifier(candidate: &str) -> bool {
    use once_cell::sync::Lazy;
    use regex::Regex;
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());
    RE.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(is_safe_identifier("M1001"));
        assert!(!is_safe_identifier("M1001; DROP TABLE"));
        assert!(!is_safe_identifier("1M1001"));
        assert!(!is_safe_identifier(""));
    }
}
