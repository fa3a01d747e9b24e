//! Turns a URL into a validated PDF on disk, with landing-page recovery and retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::pdf::{self, ValidationLimits};
use crate::publication::Publication;
use crate::source::http::build_client;

use super::filename::derive_filename;
use super::landing_page::extract_pdf_url;
use super::retry::{classify_error, FailureType, RetryDecision, RetryPolicy};
use super::{DownloadError, DownloadOutcome};

const ACCEPT_HEADER: &str = "application/pdf,*/*";
const MAX_LANDING_PAGE_RECURSION: u32 = 1;

/// Concurrent PDF downloader: HTTP GET with redirects, landing-page
/// re-resolution, byte-level validation, and atomic writes.
pub struct PDFDownloader {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    limits: ValidationLimits,
    retry_policy: RetryPolicy,
}

impl PDFDownloader {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let mut client_builder_timeout = Duration::from_secs(config.timeout_per_source_seconds);
        if client_builder_timeout.is_zero() {
            client_builder_timeout = Duration::from_secs(30);
        }
        Self {
            client: build_client(client_builder_timeout, config.accept_invalid_certs),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
            limits: ValidationLimits {
                min_size: config.min_pdf_size_bytes,
                max_size: config.max_pdf_size_bytes,
            },
            retry_policy: RetryPolicy::with_max_attempts(config.max_retries),
        }
    }

    /// Fetches `url`, validates the body as a PDF, and writes it atomically
    /// into `target_dir` under a filename derived from `identifier_hint`.
    ///
    /// Bounded by the downloader's shared semaphore (`max_concurrent_downloads`).
    /// Retries transient failures with exponential backoff; permanent failures
    /// and validation rejections return immediately.
    #[instrument(skip(self, identifier_hint), fields(url))]
    pub async fn download(&self, url: &str, target_dir: &Path, identifier_hint: &Publication) -> DownloadOutcome {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_closed) => {
                warn!("download semaphore closed");
                return DownloadOutcome::NetworkError {
                    kind: "SemaphoreClosed".to_string(),
                    attempt: 0,
                };
            }
        };

        let filename = derive_filename(identifier_hint);
        let target_path = target_dir.join(filename);

        let mut attempt: u32 = 1;
        loop {
            match self.fetch_and_validate(url, &target_path, 0).await {
                Ok(outcome) => return outcome,
                Err(error) => {
                    let failure_type = classify_error(&error);
                    match self.retry_policy.should_retry(failure_type, attempt) {
                        RetryDecision::Retry { delay, attempt: next } => {
                            warn!(attempt, delay_ms = delay.as_millis(), error = %error, "download attempt failed, retrying");
                            tokio::time::sleep(delay).await;
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(attempt, reason, "download exhausted retries");
                            return terminal_outcome(error, failure_type, attempt);
                        }
                    }
                }
            }
        }
    }

    /// Single fetch attempt. Recurses at most [`MAX_LANDING_PAGE_RECURSION`]
    /// times when the body is an HTML landing page with an unambiguous
    /// embedded PDF link, on the same underlying HTTP client.
    async fn fetch_and_validate(
        &self,
        url: &str,
        target_path: &Path,
        recursion_depth: u32,
    ) -> Result<DownloadOutcome, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url)
                } else {
                    DownloadError::network(url, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| DownloadError::network(url, e))?;

        match pdf::classify(&bytes, self.limits) {
            pdf::Classification::Valid => {
                let sha256 = write_atomically(target_path, &bytes)?;
                info!(path = %target_path.display(), size = bytes.len(), "pdf validated and written");
                Ok(DownloadOutcome::Downloaded {
                    path: target_path.to_path_buf(),
                    sha256,
                    size_bytes: bytes.len() as u64,
                    validated_at: SystemTime::now(),
                })
            }
            pdf::Classification::InvalidPdf(reason) => Ok(DownloadOutcome::InvalidPdf {
                reason,
                bytes_received: bytes.len(),
            }),
            pdf::Classification::LandingPageHtml => {
                if recursion_depth < MAX_LANDING_PAGE_RECURSION {
                    let body = String::from_utf8_lossy(&bytes);
                    if let Some(extracted) = extract_pdf_url(&body, url) {
                        debug!(extracted, "landing page detected, recursing once");
                        return Box::pin(self.fetch_and_validate(&extracted, target_path, recursion_depth + 1)).await;
                    }
                }
                Ok(DownloadOutcome::LandingPage { extracted_pdf_url: None })
            }
        }
    }
}

fn terminal_outcome(error: DownloadError, failure_type: FailureType, attempt: u32) -> DownloadOutcome {
    match error {
        DownloadError::HttpStatus { status, .. } => DownloadOutcome::HttpFailure { status, attempt },
        DownloadError::Timeout { .. } => DownloadOutcome::Timeout,
        DownloadError::Network { .. } => DownloadOutcome::NetworkError {
            kind: format!("{failure_type:?}"),
            attempt,
        },
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => DownloadOutcome::NetworkError {
            kind: format!("{failure_type:?}"),
            attempt,
        },
    }
}

/// Writes `bytes` to `path` via a sibling temp file, fsync, then rename, and
/// returns the SHA-256 of the written content.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<String, DownloadError> {
    let dir = path.parent().ok_or_else(|| DownloadError::io(path.display().to_string(), std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory")))?;
    std::fs::create_dir_all(dir).map_err(|e| DownloadError::io(dir.display().to_string(), e))?;

    let tmp_path: PathBuf = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("download")
    ));
    {
        use std::io::Write as _;
        let mut file = std::fs::File::create(&tmp_path).map_err(|e| DownloadError::io(tmp_path.display().to_string(), e))?;
        file.write_all(bytes).map_err(|e| DownloadError::io(tmp_path.display().to_string(), e))?;
        file.sync_all().map_err(|e| DownloadError::io(tmp_path.display().to_string(), e))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| DownloadError::io(path.display().to_string(), e))?;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
