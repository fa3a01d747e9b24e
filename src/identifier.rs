//! Publication identifiers: a closed tagged union, normalization, and suitability predicates.
//!
//! Identifiers are the only thing adapters are handed to decide whether they
//! apply to a publication. Normalization happens once, here, rather than inside
//! each adapter — adapters consume already-normalized values.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors produced while normalizing a raw identifier string.
#[derive(Debug, Clone, Error)]
pub enum InvalidIdentifier {
    /// The raw input was empty or contained only whitespace.
    #[error("invalid identifier: input was empty or whitespace-only\n  Suggestion: pass a non-empty DOI, PMID, PMCID, or arXiv ID")]
    Empty,
}

#[allow(clippy::expect_used)]
static DOI_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://(dx\.)?doi\.org/").expect("static regex"));

/// A tagged union of the identifier kinds the core understands.
///
/// A publication may carry several of these at once (see [`crate::publication::Publication`]);
/// each adapter consumes only the variants it needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Doi(String),
    Pmid(String),
    Pmcid(String),
    ArxivId(String),
    /// SHA-256 of a normalized title, used as a last-resort matching key when no
    /// stronger identifier is available.
    TitleHash(String),
}

impl Identifier {
    /// Normalizes a raw DOI: lowercases it and strips any `https?://doi.org/` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier::Empty`] if `raw` is empty or whitespace-only.
    pub fn normalize_doi(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        let stripped = DOI_PREFIX_RE.replace(trimmed, "");
        Ok(Self::Doi(stripped.to_ascii_lowercase()))
    }

    /// Normalizes a raw PMCID: accepted with or without the `PMC` prefix, stored
    /// with an uppercase `PMC` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier::Empty`] if `raw` is empty or whitespace-only.
    pub fn normalize_pmcid(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        let digits = trimmed
            .strip_prefix("PMC")
            .or_else(|| trimmed.strip_prefix("pmc"))
            .unwrap_or(trimmed);
        Ok(Self::Pmcid(format!("PMC{digits}")))
    }

    /// Normalizes a raw PMID: trims whitespace only, PMIDs have no case or prefix concerns.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier::Empty`] if `raw` is empty or whitespace-only.
    pub fn normalize_pmid(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        Ok(Self::Pmid(trimmed.to_string()))
    }

    /// Normalizes a raw arXiv ID: trims whitespace, strips a trailing `.pdf` and any
    /// `arXiv:` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier::Empty`] if `raw` is empty or whitespace-only.
    pub fn normalize_arxiv_id(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        let without_prefix = trimmed
            .strip_prefix("arXiv:")
            .or_else(|| trimmed.strip_prefix("arxiv:"))
            .unwrap_or(trimmed);
        let without_suffix = without_prefix.strip_suffix(".pdf").unwrap_or(without_prefix);
        Ok(Self::ArxivId(without_suffix.to_string()))
    }

    /// Builds a [`Identifier::TitleHash`] from a free-text title.
    ///
    /// The title is lowercased and whitespace-collapsed before hashing so that
    /// trivial formatting differences still produce the same key.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier::Empty`] if `title` is empty or whitespace-only.
    pub fn from_title(title: &str) -> Result<Self, InvalidIdentifier> {
        let normalized: String = title
            .trim()
            .to_ascii_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if normalized.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Ok(Self::TitleHash(format!("{:x}", hasher.finalize())))
    }

    /// The stable textual form used for cache-key hashing and logging.
    ///
    /// Idempotent: `cache_key` of an already-normalized identifier returns the
    /// same string every time.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Doi(v) => format!("doi:{v}"),
            Self::Pmid(v) => format!("pmid:{v}"),
            Self::Pmcid(v) => format!("pmcid:{v}"),
            Self::ArxivId(v) => format!("arxiv:{v}"),
            Self::TitleHash(v) => format!("title:{v}"),
        }
    }

    /// Returns the DOI string if this identifier is a [`Identifier::Doi`].
    #[must_use]
    pub fn as_doi(&self) -> Option<&str> {
        match self {
            Self::Doi(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the PMCID string (with `PMC` prefix) if this is a [`Identifier::Pmcid`].
    #[must_use]
    pub fn as_pmcid(&self) -> Option<&str> {
        match self {
            Self::Pmcid(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the numeric portion of a PMCID (`PMC12345` -> `12345`).
    #[must_use]
    pub fn pmcid_numeric(&self) -> Option<&str> {
        self.as_pmcid().map(|v| v.trim_start_matches("PMC"))
    }

    /// Returns the PMID string if this is a [`Identifier::Pmid`].
    #[must_use]
    pub fn as_pmid(&self) -> Option<&str> {
        match self {
            Self::Pmid(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the arXiv ID string if this is an [`Identifier::ArxivId`].
    #[must_use]
    pub fn as_arxiv_id(&self) -> Option<&str> {
        match self {
            Self::ArxivId(v) => Some(v),
            _ => None,
        }
    }
}

/// True iff `doi` belongs to the bioRxiv/medRxiv DOI family (`10.1101/...`).
#[must_use]
pub fn is_biorxiv_family(doi: &str) -> bool {
    doi.starts_with("10.1101/")
}

/// True iff `doi` contains the substring `arxiv`, case-insensitively.
///
/// Used to recognize arXiv's own DOI prefix (`10.48550/arXiv....`) without
/// hard-coding every historical variant.
#[must_use]
pub fn looks_like_arxiv(doi: &str) -> bool {
    doi.to_ascii_lowercase().contains("arxiv")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_doi_strips_url_prefix_and_lowercases() {
        let id = Identifier::normalize_doi("HTTPS://DOI.ORG/10.1371/Journal.Pgen.1011043").unwrap();
        assert_eq!(id, Identifier::Doi("10.1371/journal.pgen.1011043".to_string()));
    }

    #[test]
    fn normalize_doi_rejects_whitespace_only() {
        assert!(matches!(
            Identifier::normalize_doi("   "),
            Err(InvalidIdentifier::Empty)
        ));
    }

    #[test]
    fn normalize_doi_is_idempotent() {
        let once = Identifier::normalize_doi("https://doi.org/10.1/X").unwrap();
        let Identifier::Doi(once_str) = &once else {
            panic!("expected Doi");
        };
        let twice = Identifier::normalize_doi(once_str).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_pmcid_accepts_missing_prefix() {
        let id = Identifier::normalize_pmcid("11851118").unwrap();
        assert_eq!(id, Identifier::Pmcid("PMC11851118".to_string()));
    }

    #[test]
    fn normalize_pmcid_accepts_existing_prefix() {
        let id = Identifier::normalize_pmcid("PMC11851118").unwrap();
        assert_eq!(id, Identifier::Pmcid("PMC11851118".to_string()));
    }

    #[test]
    fn biorxiv_family_detection() {
        assert!(is_biorxiv_family("10.1101/2024.01.01.123456"));
        assert!(!is_biorxiv_family("10.1371/journal.pgen.1011043"));
    }

    #[test]
    fn arxiv_doi_detection_is_case_insensitive() {
        assert!(looks_like_arxiv("10.48550/arXiv.2301.01234"));
        assert!(looks_like_arxiv("10.48550/ARXIV.2301.01234"));
        assert!(!looks_like_arxiv("10.1109/5.771073"));
    }

    #[test]
    fn title_hash_is_stable_across_whitespace_variants() {
        let a = Identifier::from_title("Attention   Is All You Need").unwrap();
        let b = Identifier::from_title("attention is all you need").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_is_idempotent_and_stable() {
        let id = Identifier::Doi("10.1/x".to_string());
        assert_eq!(id.cache_key(), id.cache_key());
    }
}
