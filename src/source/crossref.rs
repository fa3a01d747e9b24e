//! Crossref adapter: extracts PDF links from work metadata.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::publication::{Publication, SourceKind};
use crate::source::error::{classify_status, StatusClass};
use crate::source::http;
use crate::source::http::build_client;
use crate::source::{LookupOutcome, SourceAdapter};

const DEFAULT_BASE_URL: &str = "https://api.crossref.org/works";

#[derive(Debug, Deserialize)]
struct CrossrefEnvelope {
    message: CrossrefWork,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(default)]
    link: Vec<CrossrefLink>,
}

#[derive(Debug, Deserialize)]
struct CrossrefLink {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "content-type")]
    content_type: Option<String>,
}

pub struct CrossrefAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl CrossrefAdapter {
    #[must_use]
    pub fn new(rate_limiter: crate::rate_limiter::RateLimiter, timeout_seconds: u64, max_retries: u32) -> Self {
        Self {
            rate_limiter,
            client: build_client(Duration::from_secs(timeout_seconds), true),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// A single request-and-classify round trip for `doi`, with no retry.
    async fn attempt(&self, doi: &str) -> LookupOutcome {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(doi));
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "crossref network error");
                return LookupOutcome::TransientError {
                    kind: "NetworkError".to_string(),
                    retry_after: None,
                };
            }
        };

        let status = response.status();
        match classify_status(status.as_u16()) {
            StatusClass::NotFound => return LookupOutcome::NotFound,
            StatusClass::AuthFailure => {
                return LookupOutcome::PermanentError {
                    kind: "AuthFailure".to_string(),
                }
            }
            StatusClass::RateLimited => {
                let retry_after = http::retry_after_from_headers(response.headers());
                return LookupOutcome::TransientError {
                    kind: "RateLimited".to_string(),
                    retry_after,
                };
            }
            StatusClass::Transient => {
                return LookupOutcome::TransientError {
                    kind: "ServerError".to_string(),
                    retry_after: None,
                }
            }
            StatusClass::Other if !status.is_success() => return LookupOutcome::NotFound,
            StatusClass::Other => {}
        }

        let parsed: CrossrefEnvelope = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "crossref malformed response");
                return LookupOutcome::PermanentError {
                    kind: "MalformedResponse".to_string(),
                };
            }
        };

        let pdf_link = parsed.message.link.into_iter().find(|l| {
            l.content_type
                .as_deref()
                .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf") || ct.contains("pdf"))
        });

        match pdf_link {
            Some(link) => LookupOutcome::found(link.url, SourceKind::Crossref),
            None => LookupOutcome::NotFound,
        }
    }
}

#[async_trait]
impl SourceAdapter for CrossrefAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Crossref
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(doi) = publication.doi() else {
            return LookupOutcome::not_applicable("no DOI present");
        };

        http::lookup_with_retry(&self.rate_limiter, self.max_retries, || self.attempt(doi)).await
    }
}
