//! Extracts a PDF URL from an HTML landing page received where a PDF was expected.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

#[allow(clippy::expect_used)]
static CITATION_PDF_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+name\s*=\s*["']citation_pdf_url["'][^>]+content\s*=\s*["']([^"']+)["']"#)
        .expect("static regex")
});

#[allow(clippy::expect_used)]
static PDF_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+\.pdf(?:\?[^"']*)?)["']"#).expect("static regex"));

/// Returns the single plausible PDF URL embedded in `html`, or `None` if
/// extraction is ambiguous (more than one candidate `href`) or finds nothing.
///
/// `<meta name="citation_pdf_url">` is checked first and, if present, wins
/// outright — it is a single authoritative publisher signal, so a page that
/// also happens to contain several `.pdf` hyperlinks is not ambiguous.
#[must_use]
pub fn extract_pdf_url(html: &str, base_url: &str) -> Option<String> {
    if let Some(captures) = CITATION_PDF_META_RE.captures(html) {
        return resolve(&captures[1], base_url);
    }

    let candidates: Vec<&str> = PDF_HREF_RE.captures_iter(html).map(|c| c.get(1).map_or("", |m| m.as_str())).collect();
    match candidates.as_slice() {
        [single] => resolve(single, base_url),
        _ => None,
    }
}

fn resolve(candidate: &str, base_url: &str) -> Option<String> {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(candidate).ok().map(|u| u.to_string())
}
