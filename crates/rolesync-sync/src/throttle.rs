//! Mutation throttle.
//!
//! A fixed minimum interval is enforced before every mutating directory
//! call, in both the cleanup and apply phases. This replaces an earlier
//! add-only pause: removals hit the same platform rate limits as grants, so
//! both are paced uniformly.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Paces mutating calls within one reconciliation job.
///
/// Each job owns its own throttle; jobs for different creators pace their
/// mutations independently.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Default spacing between mutating calls.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a throttle with the given minimum spacing.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// A throttle that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the minimum interval since the previous acquisition has
    /// elapsed, then claim the current slot.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > now {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let throttle = Throttle::new(Duration::from_secs(1));
        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_waits_min_interval() {
        let throttle = Throttle::new(Duration::from_secs(1));
        throttle.acquire().await;

        let start = Instant::now();
        throttle.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_already_elapsed() {
        let throttle = Throttle::new(Duration::from_millis(100));
        throttle.acquire().await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let start = Instant::now();
        throttle.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_disabled_never_waits() {
        let throttle = Throttle::disabled();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
    }
}
