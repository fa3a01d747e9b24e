//! Error taxonomy for source adapters.

use thiserror::Error;

/// Why an adapter did not produce a usable URL, beyond the "expected, keep
/// going" cases already folded into [`crate::source::LookupOutcome`].
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("{source} returned a malformed response: {reason}\n  Suggestion: the wire format may have changed upstream; inspect a raw response")]
    MalformedResponse { source: String, reason: String },

    #[error("{source} rejected the request: authentication required (HTTP {status})\n  Suggestion: supply valid credentials or disable this source")]
    AuthFailure { source: String, status: u16 },

    #[error("{source} network error: {reason}\n  Suggestion: check connectivity; this is usually transient")]
    Network { source: String, reason: String },
}

impl AdapterError {
    #[must_use]
    pub fn malformed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            source: source.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn auth_failure(source: impl Into<String>, status: u16) -> Self {
        Self::AuthFailure {
            source: source.into(),
            status,
        }
    }

    #[must_use]
    pub fn network(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            source: source.into(),
            reason: reason.into(),
        }
    }
}

/// Classifies an HTTP status code per the shared adapter contract (spec §4.5):
/// 404 is not-found, 401/403 is permanent auth failure, 429 is rate limiting,
/// 5xx is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    NotFound,
    AuthFailure,
    RateLimited,
    Transient,
    Other,
}

#[must_use]
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        404 => StatusClass::NotFound,
        401 | 403 => StatusClass::AuthFailure,
        429 => StatusClass::RateLimited,
        500..=599 => StatusClass::Transient,
        _ => StatusClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_status_codes() {
        assert_eq!(classify_status(404), StatusClass::NotFound);
        assert_eq!(classify_status(401), StatusClass::AuthFailure);
        assert_eq!(classify_status(403), StatusClass::AuthFailure);
        assert_eq!(classify_status(429), StatusClass::RateLimited);
        assert_eq!(classify_status(503), StatusClass::Transient);
        assert_eq!(classify_status(200), StatusClass::Other);
    }
}
