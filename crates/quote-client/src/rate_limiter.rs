use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Outbound pacing: one request in flight, starts spaced at least `min_interval` apart.
///
/// The slot returned by [`RateLimiter::acquire`] must be held for the whole
/// upstream exchange; dropping it lets the next waiter in. Waiters are served
/// in FIFO order.
#[derive(Clone)]
pub struct RateLimiter {
    last_start: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

pub type RateLimitSlot<'a> = MutexGuard<'a, Option<Instant>>;

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_start: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    pub async fn acquire(&self) -> RateLimitSlot<'_> {
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                tracing::debug!(
                    "Rate limiter: waiting {}ms for quote provider slot",
                    (ready_at - now).as_millis()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_start = Some(Instant::now());
        last_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(333));
        let start = Instant::now();
        drop(limiter.acquire().await);
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(333));
        let start = Instant::now();

        drop(limiter.acquire().await);
        drop(limiter.acquire().await);
        drop(limiter.acquire().await);

        assert!(Instant::now() - start >= Duration::from_millis(666));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let limiter = RateLimiter::new(Duration::from_millis(333));
        drop(limiter.acquire().await);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = Instant::now();
        drop(limiter.acquire().await);
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_call_in_flight() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        let slot = limiter.acquire().await;

        let other = limiter.clone();
        let pending = tokio::spawn(async move {
            let _slot = other.acquire().await;
            Instant::now()
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!pending.is_finished());

        let released_at = Instant::now();
        drop(slot);
        let acquired_at = pending.await.unwrap();
        assert!(acquired_at >= released_at);
    }
}
