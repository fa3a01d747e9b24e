//! Error types surfaced by the PDF downloader.

use thiserror::Error;

/// Failure modes the downloader can report to its caller.
///
/// This is distinct from [`crate::source::error::AdapterError`]: adapters fail
/// to *find* a URL, this fails to *fetch* one once found.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("http status {status} fetching {url}\n  Suggestion: inspect whether the source requires authentication or the URL has expired")]
    HttpStatus { url: String, status: u16 },

    #[error("timed out fetching {url}\n  Suggestion: raise timeout_per_source_seconds or accept this source as unreachable")]
    Timeout { url: String },

    #[error("network error fetching {url}: {source}\n  Suggestion: check connectivity and DNS resolution")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error writing {path}: {source}\n  Suggestion: check disk space and permissions on the target directory")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL: {url}\n  Suggestion: verify the adapter constructed a well-formed URL")]
    InvalidUrl { url: String },
}

impl DownloadError {
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    #[must_use]
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    #[must_use]
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// The outcome of a single download attempt, mirroring the tagged union the
/// rest of the system reasons about (as opposed to `DownloadError`, which is
/// only used for the error path of the low-level fetch).
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    Downloaded {
        path: std::path::PathBuf,
        sha256: String,
        size_bytes: u64,
        validated_at: std::time::SystemTime,
    },
    InvalidPdf {
        reason: crate::pdf::Rejection,
        bytes_received: usize,
    },
    LandingPage {
        extracted_pdf_url: Option<String>,
    },
    HttpFailure {
        status: u16,
        attempt: u32,
    },
    NetworkError {
        kind: String,
        attempt: u32,
    },
    Timeout,
}

impl DownloadOutcome {
    /// True if this outcome represents a successful, validated download.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }
}
