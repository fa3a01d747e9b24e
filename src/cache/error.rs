//! Errors from the content-addressed artifact cache.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error writing cache entry at {path}: {source}\n  Suggestion: check that cache_root_dir exists and is writable")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache metadata for {key}: {source}\n  Suggestion: this is a programmer error, file a bug")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn serialize(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            key: key.into(),
            source,
        }
    }
}
