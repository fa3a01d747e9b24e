//! CORE aggregator adapter: DOI search with a title-based fallback mode.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::publication::{Publication, SourceKind};
use crate::source::error::{classify_status, StatusClass};
use crate::source::http;
use crate::source::http::build_client;
use crate::source::{LookupOutcome, SourceAdapter};

const DEFAULT_BASE_URL: &str = "https://api.core.ac.uk/v3/search/works";
/// Titles shorter than this are considered too generic for a reliable match.
const MIN_TITLE_LEN_FOR_SEARCH: usize = 12;

#[derive(Debug, Deserialize)]
struct CoreSearchResponse {
    results: Vec<CoreWork>,
}

#[derive(Debug, Deserialize)]
struct CoreWork {
    #[serde(rename = "downloadUrl")]
    download_url: Option<String>,
    #[serde(rename = "fullText")]
    full_text: Option<String>,
    #[serde(rename = "sourceFulltextUrls")]
    source_fulltext_urls: Option<Vec<String>>,
}

impl CoreWork {
    fn best_url(&self) -> Option<String> {
        self.download_url
            .clone()
            .or_else(|| self.full_text.clone())
            .or_else(|| self.source_fulltext_urls.as_ref().and_then(|v| v.first().cloned()))
    }
}

pub struct CoreAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    api_key: Option<String>,
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl CoreAdapter {
    #[must_use]
    pub fn new(
        rate_limiter: crate::rate_limiter::RateLimiter,
        api_key: Option<String>,
        timeout_seconds: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            rate_limiter,
            api_key,
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

    /// A single request-and-classify round trip for `query`, with no retry.
    async fn search_attempt(&self, query: &str) -> LookupOutcome {
        let mut request = self.client.get(&self.base_url).query(&[("q", query)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "core network error");
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

        let parsed: CoreSearchResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "core malformed response");
                return LookupOutcome::PermanentError {
                    kind: "MalformedResponse".to_string(),
                };
            }
        };

        match parsed.results.iter().find_map(CoreWork::best_url) {
            Some(url) => LookupOutcome::found(url, SourceKind::Core),
            None => LookupOutcome::NotFound,
        }
    }

    async fn search(&self, query: &str) -> LookupOutcome {
        http::lookup_with_retry(&self.rate_limiter, self.max_retries, || self.search_attempt(query)).await
    }
}

#[async_trait]
impl SourceAdapter for CoreAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Core
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        if let Some(doi) = publication.doi() {
            match self.search(&format!("doi:\"{doi}\"")).await {
                LookupOutcome::NotFound => {}
                other => return other,
            }
        }

        let Some(title) = publication.title.as_deref() else {
            return LookupOutcome::NotFound;
        };
        if title.len() < MIN_TITLE_LEN_FOR_SEARCH {
            return LookupOutcome::NotFound;
        }

        self.search(&format!("title:\"{title}\"")).await
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
    async fn extracts_download_url_on_doi_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"downloadUrl": "https://core.ac.uk/download/123.pdf"}]
            })))
            .mount(&server)
            .await;

        let adapter = CoreAdapter::new(crate::rate_limiter::RateLimiter::new(100.0), None, 5, 3)
            .with_base_url(server.uri());
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/x".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        match outcome {
            LookupOutcome::Found { url, .. } => assert_eq!(url, "https://core.ac.uk/download/123.pdf"),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn falls_back_to_source_fulltext_urls_first_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"sourceFulltextUrls": ["https://repo.example/a.pdf", "https://repo.example/b.pdf"]}]
            })))
            .mount(&server)
            .await;

        let adapter = CoreAdapter::new(crate::rate_limiter::RateLimiter::new(100.0), None, 5, 3)
            .with_base_url(server.uri());
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/y".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        match outcome {
            LookupOutcome::Found { url, .. } => assert_eq!(url, "https://repo.example/a.pdf"),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn title_search_skipped_when_title_too_short() {
        let adapter = CoreAdapter::new(crate::rate_limiter::RateLimiter::new(100.0), None, 5, 3);
        let pub_ = Publication::new(vec![]).with_title("short");
        assert!(matches!(adapter.lookup(&pub_).await, LookupOutcome::NotFound));
    }

    #[tokio::test]
    async fn doi_search_rate_limited_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"downloadUrl": "https://core.ac.uk/download/999.pdf"}]
            })))
            .with_priority(10)
            .mount(&server)
            .await;

        let adapter = CoreAdapter::new(crate::rate_limiter::RateLimiter::new(1000.0), None, 5, 3)
            .with_base_url(server.uri());
        let pub_ = Publication::new(vec![Identifier::Doi("10.1/rl".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        match outcome {
            LookupOutcome::Found { url, .. } => assert_eq!(url, "https://core.ac.uk/download/999.pdf"),
            other => panic!("expected Found after retry, got {other:?}"),
        }
    }
}
