//! Sliding-window circuit breaker, scoped per network domain.
//!
//! Deliberately simpler than a three-state breaker: there is no half-open
//! probe. Callers re-check [`CircuitBreaker::is_open`] before every request,
//! and the breaker closes on its own once failures age out of the window.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use time::{Duration, OffsetDateTime};
use url::Url;

const FAILURE_WINDOW: Duration = Duration::minutes(5);
const OPEN_THRESHOLD: usize = 50;

/// Per-domain failure tracker. Failure logs are append-only and windowed at
/// read time.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    failures: Mutex<HashMap<String, Vec<OffsetDateTime>>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure against the domain of `url`. Best-effort: malformed
    /// URLs are ignored, never surfaced to the caller.
    pub fn record_failure(&self, url: &str) {
        self.record_failure_at(url, OffsetDateTime::now_utc());
    }

    fn record_failure_at(&self, url: &str, when: OffsetDateTime) {
        let Some(domain) = host_of(url) else {
            tracing::debug!(url, "ignoring failure for URL without a host");
            return;
        };
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        failures.entry(domain).or_default().push(when);
    }

    /// True once the domain of `url` has accumulated enough recent failures
    /// that requests to it should be skipped.
    pub fn is_open(&self, url: &str) -> bool {
        self.is_open_at(url, OffsetDateTime::now_utc())
    }

    fn is_open_at(&self, url: &str, now: OffsetDateTime) -> bool {
        let Some(domain) = host_of(url) else {
            return false;
        };
        let failures = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(log) = failures.get(&domain) else {
            return false;
        };
        let cutoff = now - FAILURE_WINDOW;
        log.iter().filter(|recorded| **recorded > cutoff).count() >= OPEN_THRESHOLD
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://tracker.example.com/api/search";

    #[test]
    fn closed_until_threshold_is_reached() {
        let breaker = CircuitBreaker::new();
        let now = OffsetDateTime::now_utc();

        for _ in 0..OPEN_THRESHOLD - 1 {
            breaker.record_failure_at(URL, now);
        }
        assert!(!breaker.is_open_at(URL, now));

        breaker.record_failure_at(URL, now);
        assert!(breaker.is_open_at(URL, now));
    }

    #[test]
    fn closes_again_once_failures_age_out() {
        let breaker = CircuitBreaker::new();
        let now = OffsetDateTime::now_utc();

        for _ in 0..OPEN_THRESHOLD {
            breaker.record_failure_at(URL, now);
        }
        assert!(breaker.is_open_at(URL, now));

        // No reset call; the window simply slides past the failures.
        assert!(!breaker.is_open_at(URL, now + Duration::minutes(6)));
    }

    #[test]
    fn domains_are_tracked_independently() {
        let breaker = CircuitBreaker::new();
        let now = OffsetDateTime::now_utc();

        for _ in 0..OPEN_THRESHOLD {
            breaker.record_failure_at(URL, now);
        }
        assert!(breaker.is_open_at(URL, now));
        assert!(!breaker.is_open_at("https://other.example.com/", now));

        // Same domain, different path: still open.
        assert!(breaker.is_open_at("https://tracker.example.com/other", now));
    }

    #[test]
    fn malformed_urls_are_ignored() {
        let breaker = CircuitBreaker::new();

        breaker.record_failure("not a url");
        breaker.record_failure("/relative/path");
        assert!(!breaker.is_open("not a url"));
    }
}
