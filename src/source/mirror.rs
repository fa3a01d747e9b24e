//! Shared landing-page scraping for the gray-area mirror adapters.
//!
//! Deliberately abstract: the spec treats SciHub/LibGen mirror HTML as
//! brittle and mirror-specific, so this looks for the general shape (a
//! quoted `href`/`src` attribute ending in `.pdf`) rather than encoding any
//! one mirror's markup.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static PDF_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:href|src)\s*=\s*["']([^"']+\.pdf(?:\?[^"']*)?)["']"#).expect("static regex"));

/// Scans `body` for the first quoted attribute pointing at a `.pdf` resource,
/// resolving a scheme-relative (`//host/...`) or root-relative (`/path`) link
/// against `mirror_base`.
#[must_use]
pub fn scrape_pdf_link(body: &str, mirror_base: &str) -> Option<String> {
    let captured = &PDF_LINK_RE.captures(body)?[1];

    if captured.starts_with("http://") || captured.starts_with("https://") {
        return Some(captured.to_string());
    }
    if let Some(rest) = captured.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if captured.starts_with('/') {
        let base = mirror_base.trim_end_matches('/');
        return Some(format!("{base}{captured}"));
    }
    None
}
