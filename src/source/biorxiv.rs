//! bioRxiv adapter: constructs the canonical PDF URL without probing.

use async_trait::async_trait;
use tracing::instrument;

use crate::identifier::is_biorxiv_family;
use crate::publication::{Publication, SourceKind};
use crate::source::{LookupOutcome, SourceAdapter};

pub struct BioRxivAdapter;

#[async_trait]
impl SourceAdapter for BioRxivAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::BioRxiv
    }

    #[instrument(skip(self, publication))]
    async fn lookup(&self, publication: &Publication) -> LookupOutcome {
        let Some(doi) = publication.doi() else {
            return LookupOutcome::not_applicable("no DOI present");
        };
        if !is_biorxiv_family(doi) {
            return LookupOutcome::not_applicable("DOI is not in the 10.1101/ bioRxiv family");
        }
        LookupOutcome::found(
            format!("https://www.biorxiv.org/content/{doi}.full.pdf"),
            SourceKind::BioRxiv,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;

    #[tokio::test]
    async fn constructs_canonical_pdf_url_for_biorxiv_doi() {
        let adapter = BioRxivAdapter;
        let pub_ = Publication::new(vec![Identifier::Doi("10.1101/2024.01.01.123456".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        match outcome {
            LookupOutcome::Found { url, .. } => {
                assert_eq!(url, "https://www.biorxiv.org/content/10.1101/2024.01.01.123456.full.pdf");
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_applicable_for_non_biorxiv_doi() {
        let adapter = BioRxivAdapter;
        let pub_ = Publication::new(vec![Identifier::Doi("10.1371/journal.pgen.1011043".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        assert!(matches!(outcome, LookupOutcome::NotApplicable { .. }));
    }

    #[tokio::test]
    async fn not_applicable_without_doi() {
        let adapter = BioRxivAdapter;
        let pub_ = Publication::new(vec![Identifier::Pmid("1".to_string())]);
        let outcome = adapter.lookup(&pub_).await;
        assert!(matches!(outcome, LookupOutcome::NotApplicable { .. }));
    }
}
