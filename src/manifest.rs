//! GEO-centric PDF manifest: organizes downloaded PDFs by dataset for
//! downstream audit and export.
//!
//! Layout: `{base}/pdfs/by_geo/{geo_id}/pmid_{pmid}.pdf` plus a single
//! `{base}/pdfs/by_geo/{geo_id}/.manifest.json` sidecar per GEO directory.
//! Writes to one GEO directory are serialized through a directory-level
//! `tokio::sync::Mutex`; reads are unsynchronized.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Failure modes surfaced by [`ManifestStore`].
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error on {path}: {source}\n  Suggestion: check disk space and permissions under the GEO directory")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest at {path} is not valid JSON: {source}\n  Suggestion: run `manifest rebuild` to regenerate it from the files on disk")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no file recorded for pmid {pmid} in GEO dataset {geo_id}\n  Suggestion: call save() before verify(), or rebuild_manifest() if the file exists but the manifest was lost")]
    NotRecorded { geo_id: String, pmid: String },
}

impl ManifestError {
    fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    fn corrupt(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt { path: path.into(), source }
    }
}

/// One recorded PDF within a GEO dataset's manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub pmid: String,
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
    /// Unix seconds, mirroring [`crate::cache::ContentMetadata::download_date`].
    pub saved_at: u64,
    pub verified: bool,
}

/// The sidecar `.manifest.json` for one GEO directory: `pmid → entry`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    entries: HashMap<String, ManifestEntry>,
}

/// Outcome of [`ManifestStore::verify_all`].
#[derive(Debug, Clone, Serialize)]
pub struct VerifyAllReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub failures: Vec<String>,
}

/// Result of a successful [`ManifestStore::save`].
#[derive(Debug, Clone)]
pub struct SaveResult {
    pub pdf_path: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub verified: bool,
}

/// Owns the `{base}/pdfs/by_geo/` tree and the per-GEO manifest locks.
pub struct ManifestStore {
    base: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ManifestStore {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            locks: DashMap::new(),
        }
    }

    fn geo_dir(&self, geo_id: &str) -> PathBuf {
        self.base.join("pdfs").join("by_geo").join(geo_id)
    }

    fn manifest_path(&self, geo_id: &str) -> PathBuf {
        self.geo_dir(geo_id).join(".manifest.json")
    }

    fn lock_for(&self, geo_id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(geo_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn load_manifest(&self, geo_id: &str) -> Result<Manifest, ManifestError> {
        let path = self.manifest_path(geo_id);
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let bytes = std::fs::read(&path).map_err(|e| ManifestError::io(path.display().to_string(), e))?;
        serde_json::from_slice(&bytes).map_err(|e| ManifestError::corrupt(path.display().to_string(), e))
    }

    fn write_manifest(&self, geo_id: &str, manifest: &Manifest) -> Result<(), ManifestError> {
        let dir = self.geo_dir(geo_id);
        std::fs::create_dir_all(&dir).map_err(|e| ManifestError::io(dir.display().to_string(), e))?;
        let path = self.manifest_path(geo_id);
        let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| ManifestError::corrupt(path.display().to_string(), e))?;
        atomic_write(&path, &bytes).map_err(|e| ManifestError::io(path.display().to_string(), e))
    }

    /// Copies `source_path` into `{base}/pdfs/by_geo/{geo_id}/pmid_{pmid}.pdf`,
    /// updates the manifest, and re-hashes the written copy to confirm it
    /// matches before returning.
    ///
    /// Serialized per `geo_id`: concurrent `save` calls into the same GEO
    /// directory queue on the directory-level lock.
    #[instrument(skip(self, source_path), fields(geo_id, pmid))]
    pub async fn save(&self, geo_id: &str, pmid: &str, source_path: &Path) -> Result<SaveResult, ManifestError> {
        let lock = self.lock_for(geo_id);
        let _guard = lock.lock().await;

        let dir = self.geo_dir(geo_id);
        std::fs::create_dir_all(&dir).map_err(|e| ManifestError::io(dir.display().to_string(), e))?;

        let filename = format!("pmid_{pmid}.pdf");
        let dest_path = dir.join(&filename);

        let bytes = std::fs::read(source_path).map_err(|e| ManifestError::io(source_path.display().to_string(), e))?;
        atomic_write(&dest_path, &bytes).map_err(|e| ManifestError::io(dest_path.display().to_string(), e))?;

        let sha256 = sha256_hex(&bytes);
        let size_bytes = bytes.len() as u64;

        let verified = sha256_hex(&std::fs::read(&dest_path).map_err(|e| ManifestError::io(dest_path.display().to_string(), e))?) == sha256;
        let saved_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

        let mut manifest = self.load_manifest(geo_id)?;
        manifest.entries.insert(
            pmid.to_string(),
            ManifestEntry {
                pmid: pmid.to_string(),
                filename: filename.clone(),
                sha256: sha256.clone(),
                size_bytes,
                saved_at,
                verified,
            },
        );
        self.write_manifest(geo_id, &manifest)?;

        debug!(geo_id, pmid, %sha256, verified, "saved pdf into manifest");

        Ok(SaveResult {
            pdf_path: dest_path,
            sha256,
            size_bytes,
            verified,
        })
    }

    /// Re-hashes the file recorded for `pmid` and compares it to the
    /// manifest's stored hash.
    #[instrument(skip(self))]
    pub fn verify(&self, geo_id: &str, pmid: &str) -> Result<bool, ManifestError> {
        let manifest = self.load_manifest(geo_id)?;
        let entry = manifest
            .entries
            .get(pmid)
            .ok_or_else(|| ManifestError::NotRecorded { geo_id: geo_id.to_string(), pmid: pmid.to_string() })?;
        let path = self.geo_dir(geo_id).join(&entry.filename);
        let Ok(bytes) = std::fs::read(&path) else {
            return Ok(false);
        };
        Ok(sha256_hex(&bytes) == entry.sha256)
    }

    /// Verifies every entry in the GEO directory's manifest, collecting
    /// human-readable reasons for each failure.
    #[instrument(skip(self))]
    pub fn verify_all(&self, geo_id: &str) -> Result<VerifyAllReport, ManifestError> {
        let manifest = self.load_manifest(geo_id)?;
        let mut valid = 0;
        let mut failures = Vec::new();

        for entry in manifest.entries.values() {
            let path = self.geo_dir(geo_id).join(&entry.filename);
            match std::fs::read(&path) {
                Ok(bytes) if sha256_hex(&bytes) == entry.sha256 => valid += 1,
                Ok(_) => failures.push(format!("{}: sha256 mismatch", entry.filename)),
                Err(e) => failures.push(format!("{}: {e}", entry.filename)),
            }
        }

        let total = manifest.entries.len();
        Ok(VerifyAllReport {
            total,
            valid,
            invalid: failures.len(),
            failures,
        })
    }

    /// Regenerates the manifest from the `pmid_*.pdf` files actually present
    /// in the GEO directory, discarding any stale manifest. Recovery path for
    /// a lost or corrupted `.manifest.json`.
    #[instrument(skip(self))]
    pub fn rebuild_manifest(&self, geo_id: &str) -> Result<usize, ManifestError> {
        let dir = self.geo_dir(geo_id);
        let mut manifest = Manifest::default();

        if dir.exists() {
            let read_dir = std::fs::read_dir(&dir).map_err(|e| ManifestError::io(dir.display().to_string(), e))?;
            for entry in read_dir {
                let entry = entry.map_err(|e| ManifestError::io(dir.display().to_string(), e))?;
                let filename = entry.file_name().to_string_lossy().into_owned();
                let Some(pmid) = filename.strip_prefix("pmid_").and_then(|s| s.strip_suffix(".pdf")) else {
                    continue;
                };
                let bytes = std::fs::read(entry.path()).map_err(|e| ManifestError::io(entry.path().display().to_string(), e))?;
                let saved_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
                manifest.entries.insert(
                    pmid.to_string(),
                    ManifestEntry {
                        pmid: pmid.to_string(),
                        filename: filename.clone(),
                        sha256: sha256_hex(&bytes),
                        size_bytes: bytes.len() as u64,
                        saved_at,
                        verified: true,
                    },
                );
            }
        } else {
            warn!(geo_id, "rebuild_manifest on non-existent GEO directory, writing empty manifest");
        }

        let count = manifest.entries.len();
        self.write_manifest(geo_id, &manifest)?;
        Ok(count)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn atomic_write(final_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = final_path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        final_path.file_name().and_then(|n| n.to_str()).unwrap_or("manifest-entry")
    ));
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, final_path)?;
    Ok(())
}
