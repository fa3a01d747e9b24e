//! arXiv adapter: direct ID construction, with a title-search fallback.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{instrument, warn};

use crate::identifier::looks_like_arxiv;
use crate::publication::{Publication, SourceKind};
use crate::source::http;
use crate::source::http::build_client;
use crate::source::{LookupOutcome, SourceAdapter};

const DEFAULT_QUERY_URL: &str = "http://export.arxiv.org/api/query";
/// Minimum title length below which a title search is too likely to return noise.
const MIN_TITLE_LEN_FOR_SEARCH: usize = 12;

#[allow(clippy::expect_used)]
static ARXIV_DOI_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)arxiv\.(.+)$").expect("static regex"));

#[allow(clippy::expect_used)]
static ATOM_ENTRY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"arxiv\.org/abs/([^<\s]+)").expect("static regex"));

pub struct ArxivAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    client: reqwest::Client,
    query_url: String,
    max_retries: u32,
}

impl ArxivAdapter {
    #[must_use]
    pub fn new(rate_limiter: crate::rate_limiter::RateLimiter, timeout_seconds: u64, max_retries: u32) -> Self {
        Self {
            rate_limiter,
            client: build_client(Duration::from_secs(timeout_seconds), true),
            query_url: DEFAULT_QUERY_URL.to_string(),
            max_retries,
        }
    }

    #[must_use]
    pub fn with_query_url(mut self, query_url: impl Into<String>) -> Self {
        self.query_url = query_url.into();
        self
    }

    /// Extracts the arXiv ID embedded in an `arXiv`-family DOI
    /// (`10.48550/arXiv.2301.01234` -> `2301.01234`).
    fn id_from_doi(doi: &str) -> Option<String> {
        ARXIV_DOI_ID_RE.captures(doi).map(|c| c[1].to_string())
    }

    async fn title_search_attempt(&self, title: &str) -> LookupOutcome {
        let query = format!("ti:\"{title}\"");
        let response = match self
            .client
            .get(&self.query_url)
            .query(&[("search_query", query.as_str()), ("max_results", "1")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "arxiv network error");
                return LookupOutcome::TransientError {
                    kind: "NetworkError".to_string(),
                    retry_after: None,
                };
            }
        };

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = http::retry_after_from_headers(response.headers());
            return LookupOutcome::TransientError {
                kind: "RateLimited".to_string(),
                retry_after,
            };
        }
        if status.is_server_error() {
            return LookupOutcome::TransientError {
                kind: "ServerError".to_string(),
                retry_after: None,
            };
        }
        if !status.is_success() {
            return LookupOutcome::NotFound;
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "arxiv malformed response");
                return LookupOutcome::PermanentError {
                    kind: "MalformedResponse".to_string(),
                };
            }
        };

        let Some(captures) = ATOM_ENTRY_ID_RE.captures(&body) else {
            return LookupOutcome::NotFound;
        };
        let id = captures[1].trim_end_matches('/').to_string();
        LookupOutcome::found(format!("https://arxiv.org/pdf/{id}.pdf"), SourceKind::ArXiv)
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::ArXiv
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        if let Some(id) = publication.arxiv_id() {
            return LookupOutcome::found(format!("https://arxiv.org/pdf/{id}.pdf"), SourceKind::ArXiv);
        }

        if let Some(doi) = publication.doi() {
            if looks_like_arxiv(doi) {
                if let Some(id) = Self::id_from_doi(doi) {
                    return LookupOutcome::found(format!("https://arxiv.org/pdf/{id}.pdf"), SourceKind::ArXiv);
                }
            } else {
                // A non-arXiv DOI means another adapter is likely to resolve this;
                // a noisy title search would just waste a rate-limited request.
                return LookupOutcome::not_applicable("non-arXiv DOI present, another adapter likely applies");
            }
        }

        let Some(title) = publication.title.as_deref() else {
            return LookupOutcome::not_applicable("no arXiv ID, arXiv DOI, or title available");
        };
        if title.len() < MIN_TITLE_LEN_FOR_SEARCH {
            return LookupOutcome::NotFound;
        }

        http::lookup_with_retry(&self.rate_limiter, self.max_retries, || self.title_search_attempt(title)).await
    }
}
