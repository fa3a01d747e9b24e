//! PMC-XML adapter: fetches JATS XML from NCBI e-utilities and caches it.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::cache::{ContentAddressedCache, ContentMetadata};
use crate::publication::{Publication, SourceKind};
use crate::source::error::{classify_status, StatusClass};
use crate::source::http;
use crate::source::http::build_client;
use crate::source::{LookupOutcome, SourceAdapter};

const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";
const MIN_BODY_LEN: usize = 100;

pub struct PmcAdapter {
    rate_limiter: crate::rate_limiter::RateLimiter,
    api_key: Option<String>,
    client: reqwest::Client,
    cache: ContentAddressedCache,
    efetch_url: String,
    max_retries: u32,
}

impl PmcAdapter {
    #[must_use]
    pub fn new(
        rate_limiter: crate::rate_limiter::RateLimiter,
        api_key: Option<String>,
        cache_root: PathBuf,
        timeout_seconds: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            rate_limiter,
            api_key,
            client: build_client(Duration::from_secs(timeout_seconds), true),
            cache: ContentAddressedCache::new(cache_root),
            efetch_url: EFETCH_URL.to_string(),
            max_retries,
        }
    }

    /// Overrides the efetch endpoint, for pointing at a mock server in tests.
    #[must_use]
    pub fn with_efetch_url(mut self, url: impl Into<String>) -> Self {
        self.efetch_url = url.into();
        self
    }

    /// A single efetch round trip for `pmcid`/`numeric`, with no retry.
    async fn attempt(&self, pmcid: &str, numeric: &str) -> LookupOutcome {
        let mut query = vec![
            ("db".to_string(), "pmc".to_string()),
            ("id".to_string(), numeric.to_string()),
            ("retmode".to_string(), "xml".to_string()),
            ("rettype".to_string(), "full".to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key".to_string(), key.clone()));
        }

        let response = match self.client.get(&self.efetch_url).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "pmc efetch network error");
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

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "pmc efetch body read error");
                return LookupOutcome::TransientError {
                    kind: "NetworkError".to_string(),
                    retry_after: None,
                };
            }
        };

        if body.len() < MIN_BODY_LEN || body.contains("<ERROR>") {
            return LookupOutcome::PermanentError {
                kind: "MalformedResponse".to_string(),
            };
        }

        let metadata = ContentMetadata {
            identifier: pmcid.to_string(),
            source: SourceKind::PmcXml.as_str().to_string(),
            url: Some(format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{pmcid}/")),
            download_date: 0,
            size_bytes: 0,
            sha256: String::new(),
            oa_status: None,
            license: None,
        };
        if let Err(e) = self.cache.put("xml", "pmc", numeric, "nxml", body.as_bytes(), metadata) {
            warn!(error = %e, "failed to write pmc xml to cache");
        }

        LookupOutcome::found(
            format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{pmcid}/"),
            SourceKind::PmcXml,
        )
    }
}

#[async_trait]
impl SourceAdapter for PmcAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::PmcXml
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(pmcid) = publication.pmcid() else {
            return LookupOutcome::not_applicable("no PMCID present");
        };
        let numeric = pmcid.trim_start_matches("PMC");

        if let Ok(Some(_)) = self.cache.get("xml", "pmc", numeric, "nxml") {
            return LookupOutcome::found(
                format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{pmcid}/"),
                SourceKind::PmcXml,
            );
        }

        http::lookup_with_retry(&self.rate_limiter, self.max_retries, || self.attempt(pmcid, numeric)).await
    }
}
