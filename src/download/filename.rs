//! Derives a stable on-disk filename for a download from publication identifiers.

use md5::{Digest, Md5};

use crate::publication::Publication;

/// `PMID_{pmid}.pdf`, else `DOI_{escaped_doi}.pdf`, else `paper_{md5_of_title}.pdf`,
/// else a generic fallback for publications with no usable identifier at all.
#[must_use]
pub fn derive_filename(publication: &Publication) -> String {
    if let Some(pmid) = publication.pmid() {
        return format!("PMID_{pmid}.pdf");
    }
    if let Some(doi) = publication.doi() {
        return format!("DOI_{}.pdf", sanitize(doi));
    }
    if let Some(title) = publication.title.as_deref() {
        let mut hasher = Md5::new();
        hasher.update(title.as_bytes());
        return format!("paper_{:x}.pdf", hasher.finalize());
    }
    "paper_unknown.pdf".to_string()
}

/// Replaces filesystem-hostile characters (DOIs commonly contain `/`) with `_`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}
