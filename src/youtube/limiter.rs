//! Minimum-interval spacing gate for outbound catalog requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between requests.
///
/// Not a token bucket: burst capacity is exactly one request per interval.
/// The mutex is held across the sleep so concurrent callers serialize and
/// each one observes the full spacing.
pub struct RequestSpacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until at least `min_interval` has elapsed since the previous
    /// `acquire` returned, then record the new request time.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let spacer = RequestSpacer::new(Duration::from_secs(5));

        let start = Instant::now();
        spacer.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_waits_out_the_interval() {
        let spacer = RequestSpacer::new(Duration::from_secs(5));

        spacer.acquire().await;
        let start = Instant::now();
        spacer.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_counts_toward_the_interval() {
        let spacer = RequestSpacer::new(Duration::from_secs(5));

        spacer.acquire().await;
        tokio::time::advance(Duration::from_secs(3)).await;

        let start = Instant::now();
        spacer.acquire().await;

        // Only the remaining 2s should be slept
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_after_interval_is_immediate() {
        let spacer = RequestSpacer::new(Duration::from_secs(5));

        spacer.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let start = Instant::now();
        spacer.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
