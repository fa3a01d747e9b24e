//! Content-addressed on-disk cache for fetched XML and PDF artifacts.
//!
//! Exclusively owns its directory tree: every write goes through
//! [`ContentAddressedCache::put`], every read through [`ContentAddressedCache::get`].
//! Adapters never touch the filesystem directly. Writes are temp-file-then-rename,
//! matching the idempotent write pattern used throughout this crate's sidecar
//! metadata files.

pub mod error;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

pub use error::CacheError;

/// Sibling JSON metadata stored alongside every cached artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub identifier: String,
    pub source: String,
    pub url: Option<String>,
    pub download_date: u64,
    pub size_bytes: u64,
    pub sha256: String,
    pub oa_status: Option<String>,
    pub license: Option<String>,
}

/// A cache hit: the artifact's on-disk path plus its recorded metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub metadata: ContentMetadata,
}

/// Durable local store for fetched artifacts, keyed by `(content_type, source, stem)`.
///
/// `stem` is caller-supplied: the PMC adapter uses the numeric PMCID, other
/// adapters use the MD5 of the canonical identifier string (legacy
/// compatibility; the hash has no security role, hence `md-5` rather than a
/// cryptographic hash here).
pub struct ContentAddressedCache {
    root: PathBuf,
}

impl ContentAddressedCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deterministic on-disk location for `(content_type, source, stem, ext)`,
    /// usable by external consumers (e.g. a structured-content extractor) for
    /// read-back without going through this cache's API.
    #[must_use]
    pub fn path_for(&self, content_type: &str, source: &str, stem: &str, ext: &str) -> PathBuf {
        self.root
            .join(content_type)
            .join(source)
            .join(format!("{stem}.{ext}"))
    }

    fn meta_path_for(&self, content_type: &str, source: &str, stem: &str, ext: &str) -> PathBuf {
        let dir = self.root.join(content_type).join(source);
        if ext == "nxml" {
            dir.join(format!("{stem}.{ext}.meta.json"))
        } else {
            dir.join(format!("{stem}.json"))
        }
    }

    /// Returns the cached artifact and its metadata iff both the content file
    /// and its sidecar metadata file exist.
    #[instrument(skip(self))]
    pub fn get(
        &self,
        content_type: &str,
        source: &str,
        stem: &str,
        ext: &str,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let content_path = self.path_for(content_type, source, stem, ext);
        let meta_path = self.meta_path_for(content_type, source, stem, ext);
        if !content_path.exists() || !meta_path.exists() {
            return Ok(None);
        }
        let meta_bytes = std::fs::read(&meta_path)
            .map_err(|e| CacheError::io(meta_path.display().to_string(), e))?;
        let metadata: ContentMetadata = serde_json::from_slice(&meta_bytes)
            .map_err(|e| CacheError::serialize(stem.to_string(), e))?;
        Ok(Some(CacheEntry {
            path: content_path,
            metadata,
        }))
    }

    /// True iff a cache entry exists for `(content_type, source, stem, ext)`,
    /// without reading either file's contents.
    #[must_use]
    pub fn contains(&self, content_type: &str, source: &str, stem: &str, ext: &str) -> bool {
        let content_path = self.path_for(content_type, source, stem, ext);
        let meta_path = self.meta_path_for(content_type, source, stem, ext);
        content_path.exists() && meta_path.exists()
    }

    /// Writes `bytes` to the deterministic location for `(content_type, source,
    /// stem, ext)` via temp-file-then-rename, then writes the sidecar metadata
    /// the same way. Computes and fills in `size_bytes` and `sha256`.
    #[instrument(skip(self, bytes, metadata), fields(len = bytes.len()))]
    pub fn put(
        &self,
        content_type: &str,
        source: &str,
        stem: &str,
        ext: &str,
        bytes: &[u8],
        mut metadata: ContentMetadata,
    ) -> Result<CacheEntry, CacheError> {
        let content_path = self.path_for(content_type, source, stem, ext);
        let meta_path = self.meta_path_for(content_type, source, stem, ext);
        #[allow(clippy::expect_used)]
        let dir = content_path
            .parent()
            .expect("path_for always yields a path with a parent");
        std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir.display().to_string(), e))?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        metadata.size_bytes = bytes.len() as u64;
        metadata.sha256 = sha256.clone();
        metadata.download_date = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        atomic_write(&content_path, bytes).map_err(|e| CacheError::io(content_path.display().to_string(), e))?;

        let meta_bytes = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| CacheError::serialize(stem.to_string(), e))?;
        atomic_write(&meta_path, &meta_bytes)
            .map_err(|e| CacheError::io(meta_path.display().to_string(), e))?;

        debug!(content_type, source, stem, %sha256, "wrote cache entry");

        Ok(CacheEntry {
            path: content_path,
            metadata,
        })
    }
}

/// Writes `bytes` to `final_path` via a sibling temp file, fsync, then rename,
/// so a reader never observes a partially-written file.
fn atomic_write(final_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = final_path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("cache-entry")
    ));
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, final_path)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_metadata(identifier: &str) -> ContentMetadata {
        ContentMetadata {
            identifier: identifier.to_string(),
            source: "unpaywall".to_string(),
            url: Some("https://example.org/a.pdf".to_string()),
            download_date: 0,
            size_bytes: 0,
            sha256: String::new(),
            oa_status: Some("gold".to_string()),
            license: None,
        }
    }

    #[test]
    fn put_then_get_round_trips_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentAddressedCache::new(dir.path());
        let bytes = b"%PDF-1.4 fake body %%EOF".to_vec();
        cache
            .put("pdf", "unpaywall", "abc123", "pdf", &bytes, sample_metadata("10.1/x"))
            .unwrap();

        let entry = cache.get("pdf", "unpaywall", "abc123", "pdf").unwrap().unwrap();
        let on_disk = std::fs::read(&entry.path).unwrap();
        assert_eq!(on_disk, bytes);
        assert_eq!(entry.metadata.size_bytes, bytes.len() as u64);
    }

    #[test]
    fn sha256_in_metadata_matches_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentAddressedCache::new(dir.path());
        let bytes = b"hello world".to_vec();
        let entry = cache
            .put("pdf", "core", "stem1", "pdf", &bytes, sample_metadata("10.1/y"))
            .unwrap();

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let expected = format!("{:x}", hasher.finalize());
        assert_eq!(entry.metadata.sha256, expected);
    }

    #[test]
    fn get_returns_none_when_content_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentAddressedCache::new(dir.path());
        assert!(cache.get("pdf", "core", "nope", "pdf").unwrap().is_none());
    }

    #[test]
    fn xml_sidecar_uses_meta_json_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentAddressedCache::new(dir.path());
        cache
            .put("xml", "pmc", "11851118", "nxml", b"<article/>", sample_metadata("PMC11851118"))
            .unwrap();
        let meta_path = cache.meta_path_for("xml", "pmc", "11851118", "nxml");
        assert!(meta_path.ends_with("11851118.nxml.meta.json"));
    }

    #[test]
    fn pdf_sidecar_uses_plain_json_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentAddressedCache::new(dir.path());
        cache
            .put("pdf", "core", "stem2", "pdf", b"bytes", sample_metadata("10.1/z"))
            .unwrap();
        let meta_path = cache.meta_path_for("pdf", "core", "stem2", "pdf");
        assert!(meta_path.ends_with("stem2.json"));
    }

    #[test]
    fn no_temp_file_survives_a_successful_put() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentAddressedCache::new(dir.path());
        cache
            .put("pdf", "core", "stem3", "pdf", b"bytes", sample_metadata("10.1/w"))
            .unwrap();
        let target_dir = dir.path().join("pdf").join("core");
        let leftovers: Vec<_> = std::fs::read_dir(&target_dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
