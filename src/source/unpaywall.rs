//! Unpaywall adapter: the primary open-access aggregator.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::publication::{Publication, SourceKind};
use crate::source::error::{classify_status, StatusClass};
use crate::source::http;
use crate::source::http::build_client;
use crate::source::{LookupOutcome, SourceAdapter};

const DEFAULT_BASE_URL: &str = "https://api.unpaywall.org/v2";

#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    is_oa: bool,
    best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url: Option<String>,
    url_for_pdf: Option<String>,
    license: Option<String>,
    version: Option<String>,
}

pub struct UnpaywallAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    email: String,
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl UnpaywallAdapter {
    #[must_use]
    pub fn new(
        rate_limiter: crate::rate_limiter::RateLimiter,
        email: String,
        timeout_seconds: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            rate_limiter,
            email,
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
        let response = match self.client.get(&url).query(&[("email", &self.email)]).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unpaywall network error");
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

        let parsed: UnpaywallResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "unpaywall malformed response");
                return LookupOutcome::PermanentError {
                    kind: "MalformedResponse".to_string(),
                };
            }
        };

        if !parsed.is_oa {
            return LookupOutcome::NotFound;
        }

        let Some(location) = parsed.best_oa_location else {
            return LookupOutcome::NotFound;
        };

        let Some(best_url) = location.url_for_pdf.or(location.url) else {
            return LookupOutcome::NotFound;
        };

        let mut metadata = std::collections::HashMap::new();
        if let Some(license) = location.license {
            metadata.insert("license".to_string(), json!(license));
        }
        if let Some(version) = location.version {
            metadata.insert("oa_version".to_string(), json!(version));
        }
        LookupOutcome::found_with_metadata(best_url, SourceKind::Unpaywall, metadata)
    }
}

#[async_trait]
impl SourceAdapter for UnpaywallAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Unpaywall
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(doi) = publication.doi() else {
            return LookupOutcome::not_applicable("no DOI present");
        };

        http::lookup_with_retry(&self.rate_limiter, self.max_retries, || self.attempt(doi)).await
    }
}
