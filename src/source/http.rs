//! Shared HTTP client construction and retry-with-backoff for source adapters.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::download::{FailureType, RetryDecision, RetryPolicy};
use crate::rate_limiter::RateLimiter;
use crate::source::LookupOutcome;

/// Matches real browser traffic closely enough that publisher edge
/// proxies that block bare `reqwest`/`python-requests` user agents let
/// requests through.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; fulltext-acquirer-research-bot/1.0; +https://example.org/bot)";

/// Builds a `reqwest::Client` shared across one source's requests.
///
/// `accept_invalid_certs` defaults to `true` at the configuration layer
/// (publisher TLS setups are frequently broken) but is always explicit here
/// rather than implied by a global default.
#[must_use]
pub fn build_client(timeout: Duration, accept_invalid_certs: bool) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .redirect(reqwest::redirect::Policy::limited(10))
        .gzip(true)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Runs `attempt` through `rate_limiter`, re-issuing it up to `max_retries`
/// additional times when the outcome is a `TransientError`.
///
/// Backoff between attempts follows the same `2^attempt`-capped schedule as
/// the downloader's [`RetryPolicy`]. A `RateLimited` outcome that carries a
/// `retry_after` (parsed from a 429's `Retry-After` header via
/// [`retry_after_from_headers`]) waits that long instead of the computed
/// backoff delay. Any other outcome — `Found`, `NotApplicable`, `NotFound`,
/// `PermanentError`, or a `TransientError` once retries are exhausted — is
/// returned immediately.
pub async fn lookup_with_retry<F, Fut>(rate_limiter: &RateLimiter, max_retries: u32, mut attempt: F) -> LookupOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LookupOutcome>,
{
    let policy = RetryPolicy::with_max_attempts(max_retries.max(1));
    let mut attempt_no: u32 = 1;
    loop {
        rate_limiter.acquire().await;
        let outcome = attempt().await;

        let (failure_type, retry_after) = match &outcome {
            LookupOutcome::TransientError { kind, retry_after } if kind == "RateLimited" => {
                (FailureType::RateLimited, *retry_after)
            }
            LookupOutcome::TransientError { retry_after, .. } => (FailureType::Transient, *retry_after),
            _ => return outcome,
        };

        match policy.should_retry(failure_type, attempt_no) {
            RetryDecision::Retry { delay, attempt: next } => {
                let wait = retry_after.unwrap_or(delay);
                warn!(
                    attempt = attempt_no,
                    delay_ms = wait.as_millis(),
                    "adapter lookup failed transiently, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt_no = next;
            }
            RetryDecision::DoNotRetry { .. } => return outcome,
        }
    }
}

/// Parses a `Retry-After` response header into a wait duration.
///
/// Accepts both the delay-seconds form (`Retry-After: 120`) and the HTTP-date
/// form (`Retry-After: Fri, 31 Dec 1999 23:59:59 GMT`). Returns `None` if the
/// header is absent, unparseable, or already in the past.
#[must_use]
pub fn retry_after_from_headers(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let trimmed = raw.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = httpdate::parse_http_date(trimmed).ok()?;
    at.duration_since(std::time::SystemTime::now()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_on_first_try_without_sleeping() {
        let limiter = RateLimiter::new(1000.0);
        let outcome = lookup_with_retry(&limiter, 3, || async {
            LookupOutcome::found("https://example.org/a.pdf", crate::publication::SourceKind::Unpaywall)
        })
        .await;
        assert!(outcome.is_found());
    }

    #[tokio::test]
    async fn retries_transient_errors_until_exhausted_then_returns_it() {
        let limiter = RateLimiter::new(1000.0);
        let calls = AtomicU32::new(0);
        let outcome = lookup_with_retry(&limiter, 2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                LookupOutcome::TransientError {
                    kind: "ServerError".to_string(),
                    retry_after: Some(Duration::from_millis(1)),
                }
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(outcome, LookupOutcome::TransientError { .. }));
    }

    #[tokio::test]
    async fn does_not_retry_permanent_or_not_found() {
        let limiter = RateLimiter::new(1000.0);
        let calls = AtomicU32::new(0);
        let outcome = lookup_with_retry(&limiter, 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { LookupOutcome::NotFound }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome, LookupOutcome::NotFound));
    }

    #[test]
    fn retry_after_parses_delay_seconds_form() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "120".parse().unwrap());
        assert_eq!(retry_after_from_headers(&headers), Some(Duration::from_secs(120)));
    }

    #[test]
    fn retry_after_absent_is_none() {
        let headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after_from_headers(&headers), None);
    }
}
