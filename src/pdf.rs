//! Byte-level structural validation of PDF payloads.
//!
//! This is a pure module: no I/O, no async. The downloader calls
//! [`classify`] on bytes it has already read fully into memory.

const PDF_MAGIC: &[u8] = b"%PDF-";
const EOF_MARKER: &[u8] = b"%%EOF";
const EOF_TAIL_WINDOW: usize = 1024;

pub const DEFAULT_MIN_PDF_SIZE: usize = 10 * 1024;
pub const DEFAULT_MAX_PDF_SIZE: usize = 100 * 1024 * 1024;

/// Thresholds a [`classify`] call is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub min_size: usize,
    pub max_size: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_PDF_SIZE,
            max_size: DEFAULT_MAX_PDF_SIZE,
        }
    }
}

/// Why a body was rejected as not-a-valid-PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooSmall,
    TooLarge,
    MissingHeader,
    MissingEofMarker,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TooSmall => "body is smaller than the configured minimum PDF size",
            Self::TooLarge => "body is larger than the configured maximum PDF size",
            Self::MissingHeader => "body does not start with the %PDF- magic bytes",
            Self::MissingEofMarker => "body has no %%EOF marker in its final 1024 bytes",
        };
        f.write_str(s)
    }
}

/// Result of classifying a downloaded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Valid,
    InvalidPdf(Rejection),
    /// HTML was received where a PDF was expected — a landing page, not a
    /// corrupt PDF. Callers should attempt link extraction rather than
    /// treating this as a hard failure.
    LandingPageHtml,
}

/// Classifies `bytes` against `limits`.
///
/// Landing-page detection takes precedence over size/header checks: an HTML
/// document that happens to be tiny is still `LandingPageHtml`, not
/// `InvalidPdf(TooSmall)`, because the caller's remedy differs (extract a
/// link, don't just give up).
#[must_use]
pub fn classify(bytes: &[u8], limits: ValidationLimits) -> Classification {
    if looks_like_html(bytes) {
        return Classification::LandingPageHtml;
    }
    if bytes.len() < limits.min_size {
        return Classification::InvalidPdf(Rejection::TooSmall);
    }
    if bytes.len() > limits.max_size {
        return Classification::InvalidPdf(Rejection::TooLarge);
    }
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Classification::InvalidPdf(Rejection::MissingHeader);
    }
    let tail_start = bytes.len().saturating_sub(EOF_TAIL_WINDOW);
    if !contains(&bytes[tail_start..], EOF_MARKER) {
        return Classification::InvalidPdf(Rejection::MissingEofMarker);
    }
    Classification::Valid
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let prefix_len = bytes.len().min(64);
    let prefix = String::from_utf8_lossy(&bytes[..prefix_len]).to_ascii_lowercase();
    let trimmed = prefix.trim_start();
    trimmed.starts_with("<!doctype") || trimmed.starts_with("<html")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
