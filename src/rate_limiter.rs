//! Per-source request-rate gating.
//!
//! Each [`crate::source::SourceAdapter`] is built around exactly one
//! [`RateLimiter`] instance, shared by reference across every concurrent
//! invocation of the orchestrator. Acquiring a permit is cooperative: callers
//! `await` it and the scheduler runs other tasks while they wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::trace;

/// A single source's rate-limiting state: the minimum spacing between
/// requests, and when the last one was let through.
struct LimiterState {
    min_interval: Duration,
    last_acquired: Mutex<Option<Instant>>,
}

/// Gates outbound requests to one source to at most `requests_per_second`.
///
/// `acquire()` is FIFO in effect: `tokio::sync::Mutex` wakes waiters in the
/// order they queued, so concurrent acquirers are served in the order they
/// called `acquire`.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<LimiterState>,
}

impl RateLimiter {
    /// Builds a limiter allowing `requests_per_second` requests to pass per
    /// second of wall-clock time. A rate of `0.0` is clamped to a very small
    /// positive rate rather than panicking or dividing by zero.
    #[must_use]
    pub fn new(requests_per_second: f64) -> Self {
        let rate = if requests_per_second <= 0.0 {
            0.001
        } else {
            requests_per_second
        };
        let min_interval = Duration::from_secs_f64(1.0 / rate);
        Self {
            state: Arc::new(LimiterState {
                min_interval,
                last_acquired: Mutex::new(None),
            }),
        }
    }

    /// Waits until a token is available, then returns. Holds the internal
    /// lock only long enough to read and stamp `last_acquired`; the actual
    /// wait happens outside the lock so other tasks can still queue.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut last = self.state.last_acquired.lock().await;
                match *last {
                    None => {
                        *last = Some(Instant::now());
                        None
                    }
                    Some(prev) => {
                        let elapsed = prev.elapsed();
                        if elapsed >= self.state.min_interval {
                            *last = Some(Instant::now());
                            None
                        } else {
                            Some(self.state.min_interval - elapsed)
                        }
                    }
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    trace!(delay_ms = delay.as_millis(), "rate limiter waiting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// The configured minimum interval between successive acquisitions.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.state.min_interval
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_acquire_does_not_wait() {
        let limiter = RateLimiter::new(10.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn second_acquire_waits_minimum_interval() {
        let limiter = RateLimiter::new(10.0); // 100ms interval
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn zero_rate_does_not_panic() {
        let limiter = RateLimiter::new(0.0);
        limiter.acquire().await;
    }

    #[tokio::test]
    async fn concurrent_acquirers_are_serialized() {
        let limiter = RateLimiter::new(20.0); // 50ms interval
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // 4 acquisitions at 50ms spacing take at least 150ms (3 gaps).
        assert!(start.elapsed() >= Duration::from_millis(120));
    }
}
