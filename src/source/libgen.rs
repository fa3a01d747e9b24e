//! LibGen adapter: gray-area mirror, disabled by default, always tried last.
//!
//! Accepts only a DOI. Otherwise identical in shape to [`crate::source::scihub`]:
//! a rotating mirror list, first mirror to yield a scrapeable PDF link wins,
//! and a sweep that errors out on every mirror is retried with backoff.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::download::{FailureType, RetryDecision, RetryPolicy};
use crate::publication::{Publication, SourceKind};
use crate::source::http::build_client;
use crate::source::mirror::scrape_pdf_link;
use crate::source::{LookupOutcome, SourceAdapter};

pub struct LibGenAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    mirrors: Vec<String>,
    client: reqwest::Client,
    max_retries: u32,
}

impl LibGenAdapter {
    #[must_use]
    pub fn new(
        rate_limiter: crate::rate_limiter::RateLimiter,
        mirrors: Vec<String>,
        timeout_seconds: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            rate_limiter,
            mirrors,
            client: build_client(Duration::from_secs(timeout_seconds), true),
            max_retries,
        }
    }

    /// One pass over every configured mirror for `doi`, stopping at the
    /// first mirror that yields a scrapeable PDF link.
    async fn sweep(&self, doi: &str) -> LookupOutcome {
        let mut any_network_error = false;
        for mirror in &self.mirrors {
            self.rate_limiter.acquire().await;
            let url = format!("{}/scimag/{}", mirror.trim_end_matches('/'), doi);
            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, mirror, "libgen mirror network error, trying next");
                    any_network_error = true;
                    continue;
                }
            };
            if !response.status().is_success() {
                continue;
            }
            let body = match response.text().await {
                Ok(b) => b,
                Err(_) => continue,
            };
            if let Some(pdf_url) = scrape_pdf_link(&body, mirror) {
                return LookupOutcome::found(pdf_url, SourceKind::LibGen);
            }
        }

        if any_network_error {
            LookupOutcome::TransientError {
                kind: "NetworkError".to_string(),
                retry_after: None,
            }
        } else {
            LookupOutcome::NotFound
        }
    }
}

#[async_trait]
impl SourceAdapter for LibGenAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::LibGen
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(doi) = publication.doi() else {
            return LookupOutcome::not_applicable("no DOI present");
        };
        if self.mirrors.is_empty() {
            return LookupOutcome::not_applicable("no libgen mirrors configured");
        }

        let policy = RetryPolicy::with_max_attempts(self.max_retries.max(1));
        let mut attempt_no: u32 = 1;
        loop {
            let outcome = self.sweep(doi).await;
            let LookupOutcome::TransientError { .. } = &outcome else {
                return outcome;
            };

            match policy.should_retry(FailureType::Transient, attempt_no) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(attempt = attempt_no, delay_ms = delay.as_millis(), "all libgen mirrors failed, retrying sweep");
                    tokio::time::sleep(delay).await;
                    attempt_no = next;
                }
                RetryDecision::DoNotRetry { .. } => return outcome,
            }
        }
    }
}
