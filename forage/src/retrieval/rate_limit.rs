//! Per-source token-bucket rate limiter.
//!
//! A limiter owns a bounded pool of permits (capacity = burst size) and a
//! single background task that adds one permit per refill interval, derived
//! from the source's requests-per-minute budget. Acquiring never busy-polls;
//! waiters suspend on the underlying semaphore.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Semaphore, TryAcquireError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limiter is closed")]
    Closed,
    #[error("no permit available")]
    Exhausted,
}

#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl RateLimiter {
    /// Create a limiter and spawn its refill task. Must be called from within
    /// a Tokio runtime.
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let capacity = burst.max(1) as usize;
        let refill_interval =
            Duration::from_secs_f64(60.0 / f64::from(requests_per_minute.max(1)));

        let permits = Arc::new(Semaphore::new(capacity));
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let refill_permits = Arc::clone(&permits);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(refill_interval);
            // The first tick fires immediately; the bucket already starts
            // full, so consume it.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // Topping up beyond capacity is a no-op.
                        if refill_permits.available_permits() < capacity {
                            refill_permits.add_permits(1);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self { permits, shutdown }
    }

    /// Take one permit, suspending until one is refilled if the pool is
    /// empty. Returns [`RateLimitError::Closed`] once the limiter has been
    /// closed; dropping the future cancels the wait cleanly.
    pub async fn wait(&self) -> Result<(), RateLimitError> {
        match self.permits.acquire().await {
            Ok(permit) => {
                permit.forget();
                Ok(())
            }
            Err(_) => Err(RateLimitError::Closed),
        }
    }

    /// Non-blocking variant of [`wait`](Self::wait).
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Ok(())
            }
            Err(TryAcquireError::Closed) => Err(RateLimitError::Closed),
            Err(TryAcquireError::NoPermits) => Err(RateLimitError::Exhausted),
        }
    }

    /// Stop the refill task and fail every blocked and future `wait`.
    /// Idempotent.
    pub fn close(&self) {
        self.permits.close();
        let _ = self.shutdown.send(true);
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn burst_is_served_without_blocking() {
        let limiter = RateLimiter::new(6, 2);

        let started = Instant::now();
        limiter.wait().await.unwrap();
        limiter.wait().await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn third_wait_blocks_for_one_refill_interval() {
        // 6 requests per minute -> one refill every 10 seconds.
        let limiter = RateLimiter::new(6, 2);

        limiter.wait().await.unwrap();
        limiter.wait().await.unwrap();

        let started = Instant::now();
        limiter.wait().await.unwrap();
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(9), "waited only {:?}", waited);
        assert!(waited <= Duration::from_secs(11), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn refill_does_not_exceed_capacity() {
        let limiter = RateLimiter::new(60, 2);

        // Leave the bucket untouched over many refill intervals.
        tokio::time::sleep(Duration::from_secs(30)).await;

        limiter.try_acquire().unwrap();
        limiter.try_acquire().unwrap();
        assert_eq!(limiter.try_acquire(), Err(RateLimitError::Exhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn close_wakes_blocked_waiters() {
        let limiter = Arc::new(RateLimiter::new(1, 1));
        limiter.wait().await.unwrap();

        let blocked = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.wait().await })
        };
        tokio::task::yield_now().await;

        limiter.close();
        assert_eq!(blocked.await.unwrap(), Err(RateLimitError::Closed));

        // Closing twice is a no-op, and later waits keep failing.
        limiter.close();
        assert_eq!(limiter.wait().await, Err(RateLimitError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn try_acquire_reports_exhaustion() {
        let limiter = RateLimiter::new(6, 1);

        limiter.try_acquire().unwrap();
        assert_eq!(limiter.try_acquire(), Err(RateLimitError::Exhausted));
    }
}
