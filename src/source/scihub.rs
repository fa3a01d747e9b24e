//! SciHub adapter: gray-area mirror, disabled by default, always tried last.
//!
//! Accepts either a DOI or a PMID. Mirrors are tried in order; any HTTP or
//! parse failure on one mirror simply advances to the next — the mirror list
//! is a rotating pool, not a fixed protocol the spec prescribes. If every
//! mirror in a sweep comes back with a network error, the whole sweep is
//! retried with backoff before giving up, the same as the other adapters.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::download::{FailureType, RetryDecision, RetryPolicy};
use crate::publication::{Publication, SourceKind};
use crate::source::http::build_client;
use crate::source::mirror::scrape_pdf_link;
use crate::source::{LookupOutcome, SourceAdapter};

pub struct SciHubAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    mirrors: Vec<String>,
    client: reqwest::Client,
    max_retries: u32,
}

impl SciHubAdapter {
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

    /// One pass over every configured mirror for `key`, stopping at the
    /// first mirror that yields a scrapeable PDF link.
    async fn sweep(&self, key: &str) -> LookupOutcome {
        let mut any_network_error = false;
        for mirror in &self.mirrors {
            self.rate_limiter.acquire().await;
            let url = format!("{}/{}", mirror.trim_end_matches('/'), key);
            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, mirror, "scihub mirror network error, trying next");
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
                return LookupOutcome::found(pdf_url, SourceKind::SciHub);
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
impl SourceAdapter for SciHubAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::SciHub
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(key) = publication.doi().or_else(|| publication.pmid()) else {
            return LookupOutcome::not_applicable("no DOI or PMID present");
        };
        if self.mirrors.is_empty() {
            return LookupOutcome::not_applicable("no scihub mirrors configured");
        }

        let policy = RetryPolicy::with_max_attempts(self.max_retries.max(1));
        let mut attempt_no: u32 = 1;
        loop {
            let outcome = self.sweep(key).await;
            let LookupOutcome::TransientError { .. } = &outcome else {
                return outcome;
            };

            match policy.should_retry(FailureType::Transient, attempt_no) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(attempt = attempt_no, delay_ms = delay.as_millis(), "all scihub mirrors failed, retrying sweep");
                    tokio::time::sleep(delay).await;
                    attempt_no = next;
                }
                RetryDecision::DoNotRetry { .. } => return outcome,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn not_applicable_without_doi_or_pmid() {
        let adapter = SciHubAdapter::new(
            crate::rate_limiter::RateLimiter::new(100.0),
            vec!["https://sci-hub.example".to_string()],
            5,
            3,
        );
        let pub_ = Publication::new(vec![Identifier::ArxivId("2301.01234".to_string())]);
        assert!(matches!(
            adapter.lookup(&pub_).await,
            LookupOutcome::NotApplicable { .. }
        ));
    }

    #[tokio::test]
    async fn not_applicable_with_no_mirrors() {
        let adapter = SciHubAdapter::new(crate::rate_limiter::RateLimiter::new(100.0), vec![], 5, 3);
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/x".to_string())]);
        assert!(matches!(
            adapter.lookup(&pub_).await,
            LookupOutcome::NotApplicable { .. }
        ));
    }

    #[tokio::test]
    async fn finds_pdf_link_on_first_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><iframe src="//sci-hub.example/downloads/a.pdf"></iframe></body></html>"#,
            ))
            .mount(&server)
            .await;

        let adapter = SciHubAdapter::new(crate::rate_limiter::RateLimiter::new(100.0), vec![server.uri()], 5, 3);
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/x".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        assert!(outcome.is_found());
    }

    #[tokio::test]
    async fn advances_to_next_mirror_when_first_has_no_match() {
        let dead = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing here</html>"))
            .mount(&dead)
            .await;
        let live = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="/articles/b.pdf">download</a>"#,
            ))
            .mount(&live)
            .await;

        let adapter = SciHubAdapter::new(
            crate::rate_limiter::RateLimiter::new(100.0),
            vec![dead.uri(), live.uri()],
            5,
            3,
        );
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/y".to_string())]);
        assert!(adapter.lookup(&pub_).await.is_found());
    }

    #[tokio::test]
    async fn retries_the_whole_sweep_when_every_mirror_errors_once() {
        let adapter = SciHubAdapter::new(
            crate::rate_limiter::RateLimiter::new(1000.0),
            vec!["http://127.0.0.1:1".to_string()],
            1,
            2,
        );
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/unreachable".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        assert!(matches!(outcome, LookupOutcome::TransientError { .. }));
    }
}
