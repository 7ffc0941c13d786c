//! Per-provider rate limiting
//!
//! Fixed-window counters sized to each provider's free-tier quota.
//! A drained window never blocks: the caller skips the provider and
//! the merged record simply lacks that payload for this pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Fixed window counter.
pub struct FixedWindowLimiter {
    max_requests: u64,
    window: Duration,
    count: AtomicU64,
    window_start: parking_lot::Mutex<Instant>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: u64::from(max_requests.max(1)),
            window,
            count: AtomicU64::new(0),
            window_start: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Try to consume one request from the current window.
    pub fn try_acquire(&self) -> bool {
        self.roll_window();

        loop {
            let current = self.count.load(Ordering::Acquire);
            if current >= self.max_requests {
                return false;
            }

            if self
                .count
                .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Time until the current window resets.
    pub fn retry_after(&self) -> Duration {
        let window_start = self.window_start.lock();
        self.window.saturating_sub(window_start.elapsed())
    }

    /// Requests left in the current window.
    pub fn remaining(&self) -> u64 {
        self.roll_window();
        self.max_requests
            .saturating_sub(self.count.load(Ordering::Acquire))
    }

    fn roll_window(&self) {
        let mut window_start = self.window_start.lock();
        if window_start.elapsed() >= self.window {
            *window_start = Instant::now();
            self.count.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_drains_then_skips() {
        let limiter = FixedWindowLimiter::new(4, Duration::from_secs(60));
        for _ in 0..4 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_window_rolls_over() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        std::thread::sleep(Duration::from_millis(25));
        assert!(limiter.try_acquire());
    }

    #[test]
    fn test_retry_after_bounded_by_window() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.retry_after() <= Duration::from_secs(60));
    }
}
