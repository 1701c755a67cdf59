//! ObjectStoreAdapter — local filesystem backing
//!
//! Page-blob input for C5/C7 lives under `<prefix>/[<job_id>/]page_NNNN.json`;
//! everything else under a prefix (manifests, metadata, consolidated
//! rollups) is skipped by `list` when it is asked for page files, matching
//! spec §6. Grounded on the teacher's `memory/vector.rs` choice of a plain
//! directory-backed store rather than a real S3 client — this crate has no
//! object-store crate in its stack, so local disk stands in for it the same
//! way.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SKIPPED_FILENAMES: &[&str] = &["manifest.json", "metadata.json", "consolidated.json"];

#[async_trait]
pub trait ObjectStoreAdapter: Send + Sync {
    /// List keys under `prefix`. `delimiter` mirrors S3 semantics: when
    /// `Some("/")`, only the immediate children of `prefix` are returned
    /// (sub-"directories" are collapsed to their own key, not recursed
    /// into); when `None`, listing is fully recursive.
    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> CoreResult<Vec<String>>;

    async fn get(&self, key: &str) -> CoreResult<Vec<u8>>;

    async fn put(&self, key: &str, bytes: &[u8], metadata: Option<HashMap<String, String>>) -> CoreResult<()>;

    /// Liveness check surfaced by the Health endpoint (spec §6).
    async fn is_initialized(&self) -> bool;
}

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }

    fn relative_key(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[async_trait]
impl ObjectStoreAdapter for LocalObjectStore {
    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> CoreResult<Vec<String>> {
        let dir = self.full_path(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut stack = vec![dir.clone()];
        while let Some(current) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&current).await.map_err(CoreError::from)?;
            while let Some(entry) = entries.next_entry().await.map_err(CoreError::from)? {
                let path = entry.path();
                if path.is_dir() {
                    if delimiter.is_some() {
                        keys.push(format!("{}/", self.relative_key(&path)));
                    } else {
                        stack.push(path);
                    }
                } else {
                    keys.push(self.relative_key(&path));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> CoreResult<Vec<u8>> {
        let path = self.full_path(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| CoreError::NotFound(format!("{}: {}", key, e)))
    }

    async fn put(&self, key: &str, bytes: &[u8], metadata: Option<HashMap<String, String>>) -> CoreResult<()> {
        let path = self.full_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(CoreError::from)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(CoreError::from)?;

        if let Some(meta) = metadata {
            if !meta.is_empty() {
                let meta_path = path.with_extension("meta.json");
                let json = serde_json::to_vec(&meta).map_err(|e| CoreError::Internal(e.to_string()))?;
                tokio::fs::write(&meta_path, json).await.map_err(CoreError::from)?;
            }
        }
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        tokio::fs::create_dir_all(&self.root).await.is_ok()
    }
}

/// True when `filename` is one of the non-page blobs that indexing must skip.
pub fn is_skipped_filename(filename: &str) -> bool {
    SKIPPED_FILENAMES.contains(&filename)
}

/// Extracts the zero-padded page number from a `page_NNNN.json` key, if any.
pub fn page_number(key: &str) -> Option<u32> {
    let filename = key.rsplit('/').next().unwrap_or(key);
    if is_skipped_filename(filename) {
        return None;
    }
    let stem = filename.strip_prefix("page_")?.strip_suffix(".json")?;
    stem.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("jobs/abc/page_0001.json", b"{}", None).await.unwrap();
        let bytes = store.get("jobs/abc/page_0001.json").await.unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn list_skips_nothing_itself_but_page_number_filters() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("jobs/abc/page_0001.json", b"{}", None).await.unwrap();
        store.put("jobs/abc/manifest.json", b"{}", None).await.unwrap();
        let keys = store.list("jobs/abc", None).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(page_number("jobs/abc/page_0001.json"), Some(1));
        assert_eq!(page_number("jobs/abc/manifest.json"), None);
    }

    #[test]
    fn rejects_skipped_filenames() {
        assert!(is_skipped_filename("manifest.json"));
        assert!(is_skipped_filename("metadata.json"));
        assert!(is_skipped_filename("consolidated.json"));
        assert!(!is_skipped_filename("page_0001.json"));
    }
}
