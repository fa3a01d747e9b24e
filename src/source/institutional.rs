//! Synchronous institutional-proxy URL construction. No network probe.

use async_trait::async_trait;
use tracing::instrument;

use crate::publication::{Publication, SourceKind};
use crate::source::{LookupOutcome, SourceAdapter};

pub struct InstitutionalAdapter {
    proxy_suffix: String,
}

impl InstitutionalAdapter {
    #[must_use]
    pub fn new(proxy_suffix: String) -> Self {
        Self { proxy_suffix }
    }

    /// Builds `https://doi.org/{doi}{suffix}`, the common EZproxy rewrite pattern.
    fn proxy_url(&self, doi: &str) -> String {
        format!("https://doi.org/{doi}{}", self.proxy_suffix)
    }
}

#[async_trait]
impl SourceAdapter for InstitutionalAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Institutional
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(doi) = publication.doi() else {
            return LookupOutcome::not_applicable("no DOI present");
        };
        LookupOutcome::found(self.proxy_url(doi), SourceKind::Institutional)
    }
}
