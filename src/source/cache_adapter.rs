//! Highest-priority adapter: serves an already-downloaded PDF with no network call.

use std::path::PathBuf;

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde_json::json;
use tracing::instrument;

use crate::publication::{Publication, SourceKind};
use crate::source::{LookupOutcome, SourceAdapter};

pub struct CacheAdapter {
    cache_root: PathBuf,
}

impl CacheAdapter {
    #[must_use]
    pub fn new(cache_root: PathBuf) -> Self {
        Self { cache_root }
    }

    /// Scans `{cache_root}/pdf/*/{md5(identifier)}.pdf` for any source that
    /// already holds this publication; the cache key is source-agnostic by
    /// design so a hit from any prior adapter counts.
    fn find_cached_pdf(&self, cache_key: &str) -> Option<(PathBuf, u64)> {
        let mut hasher = Md5::new();
        hasher.update(cache_key.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let pdf_dir = self.cache_root.join("pdf");
        let entries = std::fs::read_dir(&pdf_dir).ok()?;
        for entry in entries.flatten() {
            let candidate = entry.path().join(format!("{digest}.pdf"));
            if let Ok(meta) = std::fs::metadata(&candidate) {
                return Some((candidate, meta.len()));
            }
        }
        None
    }
}

#[async_trait]
impl SourceAdapter for CacheAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Cache
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(cache_key) = publication.primary_cache_key() else {
            return LookupOutcome::not_applicable("publication carries no identifier");
        };

        match self.find_cached_pdf(&cache_key) {
            Some((path, size)) => {
                let url = format!("file://{}", path.display());
                let mut metadata = std::collections::HashMap::new();
                metadata.insert("cached".to_string(), json!(true));
                metadata.insert("size".to_string(), json!(size));
                LookupOutcome::found_with_metadata(url, SourceKind::Cache, metadata)
            }
            None => LookupOutcome::NotFound,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;

    #[tokio::test]
    async fn returns_not_found_when_no_cache_directory_exists() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CacheAdapter::new(dir.path().to_path_buf());
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/x".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        assert!(matches!(outcome, LookupOutcome::NotFound));
    }

    #[tokio::test]
    async fn finds_an_existing_cached_pdf_by_md5_of_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CacheAdapter::new(dir.path().to_path_buf());
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/x".to_string())]);
        let cache_key = pub_.primary_cache_key().unwrap();

        let mut hasher = Md5::new();
        hasher.update(cache_key.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let source_dir = dir.path().join("pdf").join("unpaywall");
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join(format!("{digest}.pdf")), b"%PDF-1.4 %%EOF").unwrap();

        let outcome = adapter.lookup(&pub_).await;
        match outcome {
            LookupOutcome::Found { url, source, .. } => {
                assert!(url.starts_with("file://"));
                assert_eq!(source, SourceKind::Cache);
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_identifiers_means_not_applicable() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CacheAdapter::new(dir.path().to_path_buf());
        let pub_ = Publication::new(vec![]);
        let outcome = adapter.lookup(&pub_).await;
        assert!(matches!(outcome, LookupOutcome::NotApplicable { .. }));
    }
}
