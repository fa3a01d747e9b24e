//! Source adapters: one uniform trait, eleven wire-protocol implementations.

pub mod error;
pub mod http;
pub mod mirror;

pub mod arxiv;
pub mod biorxiv;
pub mod cache_adapter;
pub mod core_api;
pub mod crossref;
pub mod institutional;
pub mod libgen;
pub mod openalex;
pub mod pmc;
pub mod scihub;
pub mod unpaywall;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::config::Config;
use crate::publication::{Publication, SourceKind};
use crate::rate_limiter::RateLimiter;
pub use error::AdapterError;

/// What an adapter found, or why it did not find anything.
///
/// `NotApplicable` and `NotFound` are both "continue to the next source" from
/// the orchestrator's point of view, but are kept distinct because they carry
/// different diagnostic value: `NotApplicable` means the adapter was never
/// invoked in a meaningful sense (it declined before any network call),
/// `NotFound` means it tried and came up empty.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    Found {
        url: String,
        source: SourceKind,
        metadata: HashMap<String, JsonValue>,
    },
    NotApplicable {
        reason: String,
    },
    NotFound,
    TransientError {
        kind: String,
        retry_after: Option<Duration>,
    },
    PermanentError {
        kind: String,
    },
}

impl LookupOutcome {
    #[must_use]
    pub fn found(url: impl Into<String>, source: SourceKind) -> Self {
        Self::Found {
            url: url.into(),
            source,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn found_with_metadata(
        url: impl Into<String>,
        source: SourceKind,
        metadata: HashMap<String, JsonValue>,
    ) -> Self {
        Self::Found {
            url: url.into(),
            source,
            metadata,
        }
    }

    #[must_use]
    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self::NotApplicable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Uniform capability every content source implements.
///
/// Adapters depend only on their `RateLimiter` and a shared `reqwest::Client`
/// (via [`crate::source::http::build_client`]) — never on the orchestrator or
/// on each other, so there is no cyclic ownership between a "manager" and its
/// adapters.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter implements; used for priority ordering,
    /// `skip_sources` membership, and statistics.
    fn kind(&self) -> SourceKind;

    /// Attempts to find a full-text URL for `publication`. Must return
    /// `NotApplicable` without making any network call if the publication
    /// lacks the identifier this adapter requires.
    async fn lookup(&self, publication: &Publication) -> LookupOutcome;
}

/// Owns every enabled adapter, constructed once from a [`Config`].
///
/// Breaks the teacher pattern's Manager/Adapter cycle: the registry only ever
/// hands out adapters, it never receives calls back from them.
pub struct SourceRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl SourceRegistry {
    /// Builds the registry from `config`, constructing exactly the adapters
    /// whose `enable_*` flag is set (gray-area sources additionally require
    /// their own opt-in, see [`Config::enable_scihub`] / [`Config::enable_libgen`]).
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

        if config.enable_cache {
            adapters.push(Box::new(cache_adapter::CacheAdapter::new(config.cache_root_dir.clone())));
        }
        if config.enable_institutional {
            if let Some(suffix) = config.institutional_proxy_suffix.clone() {
                adapters.push(Box::new(institutional::InstitutionalAdapter::new(suffix)));
            }
        }
        if config.enable_pmc {
            adapters.push(Box::new(pmc::PmcAdapter::new(
                RateLimiter::new(config.pmc_requests_per_second()),
                config.ncbi_api_key.clone(),
                config.cache_root_dir.clone(),
                config.timeout_per_source_seconds,
                config.max_retries,
            )));
        }
        if config.enable_unpaywall {
            if let Some(email) = config.unpaywall_email.clone() {
                adapters.push(Box::new(unpaywall::UnpaywallAdapter::new(
                    RateLimiter::new(3.0),
                    email,
                    config.timeout_per_source_seconds,
                    config.max_retries,
                )));
            }
        }
        if config.enable_core {
            adapters.push(Box::new(core_api::CoreAdapter::new(
                RateLimiter::new(3.0),
                config.core_api_key.clone(),
                config.timeout_per_source_seconds,
                config.max_retries,
            )));
        }
        if config.enable_openalex {
            adapters.push(Box::new(openalex::OpenAlexAdapter));
        }
        if config.enable_crossref {
            adapters.push(Box::new(crossref::CrossrefAdapter::new(
                RateLimiter::new(3.0),
                config.timeout_per_source_seconds,
                config.max_retries,
            )));
        }
        if config.enable_biorxiv {
            adapters.push(Box::new(biorxiv::BioRxivAdapter));
        }
        if config.enable_arxiv {
            adapters.push(Box::new(arxiv::ArxivAdapter::new(
                RateLimiter::new(1.0),
                config.timeout_per_source_seconds,
                config.max_retries,
            )));
        }
        if config.enable_scihub {
            adapters.push(Box::new(scihub::SciHubAdapter::new(
                RateLimiter::new(1.0),
                config.scihub_mirrors.clone(),
                config.timeout_per_source_seconds,
                config.max_retries,
            )));
        }
        if config.enable_libgen {
            adapters.push(Box::new(libgen::LibGenAdapter::new(
                RateLimiter::new(1.0),
                config.libgen_mirrors.clone(),
                config.timeout_per_source_seconds,
                config.max_retries,
            )));
        }

        Self { adapters }
    }

    /// Adapters in the fixed waterfall priority order (see
    /// [`crate::orchestrator::SOURCE_PRIORITY`]), skipping any whose kind is in
    /// `skip_sources`.
    pub fn ordered_adapters(&self, skip_sources: &[SourceKind]) -> Vec<&dyn SourceAdapter> {
        let mut ordered: Vec<&dyn SourceAdapter> = self
            .adapters
            .iter()
            .filter(|a| !skip_sources.contains(&a.kind()))
            .map(std::convert::AsRef::as_ref)
            .collect();
        ordered.sort_by_key(|a| crate::orchestrator::priority_rank(a.kind()));
        ordered
    }
}
