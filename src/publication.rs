//! The mutable record an acquisition run threads through every component.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// Which kind of source ultimately produced a full-text URL or file.
///
/// Ordering here has no semantic meaning; priority lives in
/// [`crate::orchestrator::SOURCE_PRIORITY`] instead, so that the two concerns
/// can evolve independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Cache,
    Institutional,
    PmcXml,
    Unpaywall,
    Core,
    OpenAlexOa,
    Crossref,
    BioRxiv,
    ArXiv,
    SciHub,
    LibGen,
}

impl SourceKind {
    /// Short lowercase identifier used in manifest files, logs, and `--skip-sources`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Institutional => "institutional",
            Self::PmcXml => "pmc-xml",
            Self::Unpaywall => "unpaywall",
            Self::Core => "core",
            Self::OpenAlexOa => "openalex-oa",
            Self::Crossref => "crossref",
            Self::BioRxiv => "biorxiv",
            Self::ArXiv => "arxiv",
            Self::SciHub => "scihub",
            Self::LibGen => "libgen",
        }
    }

    /// Parses the short identifier produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "cache" => Self::Cache,
            "institutional" => Self::Institutional,
            "pmc-xml" => Self::PmcXml,
            "unpaywall" => Self::Unpaywall,
            "core" => Self::Core,
            "openalex-oa" => Self::OpenAlexOa,
            "crossref" => Self::Crossref,
            "biorxiv" => Self::BioRxiv,
            "arxiv" => Self::ArXiv,
            "scihub" => Self::SciHub,
            "libgen" => Self::LibGen,
            _ => return None,
        })
    }

    /// Sources that are gray-area (copyright-ambiguous) and therefore disabled
    /// unless explicitly opted into via configuration.
    #[must_use]
    pub fn is_gray_area(self) -> bool {
        matches!(self, Self::SciHub | Self::LibGen)
    }
}

/// A publication moving through the waterfall, accumulating state as adapters
/// and the downloader act on it.
///
/// Identifiers are set once at construction. The remaining fields start `None`
/// and are filled in by whichever component resolves them; later components
/// read what earlier ones wrote.
#[derive(Debug, Clone)]
pub struct Publication {
    pub identifiers: Vec<Identifier>,
    pub title: Option<String>,
    /// Upstream-discovery-supplied OA URL; consumed only by `OpenAlexOa`,
    /// which makes no network call of its own.
    pub oa_url: Option<String>,
    /// Set by a `SourceAdapter` once a candidate full-text URL is found.
    pub fulltext_url: Option<String>,
    /// Set alongside `fulltext_url`: which adapter produced it.
    pub source: Option<SourceKind>,
    /// Set by the downloader once bytes have landed on disk.
    pub pdf_path: Option<PathBuf>,
    /// Set by the downloader after validation succeeds.
    pub pdf_sha256: Option<String>,
}

impl Publication {
    /// Builds a publication from one or more identifiers. At least one
    /// identifier must be supplied; callers that only have a title should use
    /// [`Identifier::from_title`] to produce one.
    #[must_use]
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self {
            identifiers,
            title: None,
            oa_url: None,
            fulltext_url: None,
            source: None,
            pdf_path: None,
            pdf_sha256: None,
        }
    }

    /// Attaches the upstream-discovered OA URL consumed by the `OpenAlexOa` adapter.
    #[must_use]
    pub fn with_oa_url(mut self, oa_url: impl Into<String>) -> Self {
        self.oa_url = Some(oa_url.into());
        self
    }

    /// Attaches a title, used for `OpenAlexOa`-style metadata lookups and as
    /// the basis for a [`Identifier::TitleHash`] fallback key.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// First identifier of the requested variant, if present.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        self.identifiers.iter().find_map(Identifier::as_doi)
    }

    #[must_use]
    pub fn pmid(&self) -> Option<&str> {
        self.identifiers.iter().find_map(Identifier::as_pmid)
    }

    #[must_use]
    pub fn pmcid(&self) -> Option<&str> {
        self.identifiers.iter().find_map(Identifier::as_pmcid)
    }

    #[must_use]
    pub fn arxiv_id(&self) -> Option<&str> {
        self.identifiers.iter().find_map(Identifier::as_arxiv_id)
    }

    /// Cache key for the strongest identifier available: DOI, then PMCID, then
    /// PMID, then arXiv ID, then title hash. Publications with no identifiers
    /// at all have no cache key and cannot be cached.
    #[must_use]
    pub fn primary_cache_key(&self) -> Option<String> {
        self.identifiers
            .iter()
            .find(|id| matches!(id, Identifier::Doi(_)))
            .or_else(|| self.identifiers.iter().find(|id| matches!(id, Identifier::Pmcid(_))))
            .or_else(|| self.identifiers.iter().find(|id| matches!(id, Identifier::Pmid(_))))
            .or_else(|| self.identifiers.iter().find(|id| matches!(id, Identifier::ArxivId(_))))
            .or_else(|| self.identifiers.iter().find(|id| matches!(id, Identifier::TitleHash(_))))
            .map(Identifier::cache_key)
    }
}
