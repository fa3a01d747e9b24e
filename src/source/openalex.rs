//! OpenAlexOA adapter: no network call, reads upstream-discovered metadata.

use async_trait::async_trait;
use tracing::instrument;

use crate::publication::{Publication, SourceKind};
use crate::source::{LookupOutcome, SourceAdapter};

pub struct OpenAlexAdapter;

#[async_trait]
impl SourceAdapter for OpenAlexAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenAlexOa
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        match &publication.oa_url {
            Some(url) => LookupOutcome::found(url.clone(), SourceKind::OpenAlexOa),
            None => LookupOutcome::not_applicable("no inbound oa_url metadata"),
        }
    }
}
