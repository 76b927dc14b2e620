//! Per-IP sliding-window request limiter.
//!
//! Process-local by design: counters reset on restart and are not shared
//! across instances. Each client IP maps to the timestamps of its recent
//! requests; on every check the entry is pruned to the window before the
//! count is compared against the threshold.

use ahash::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Buckets kept before an opportunistic sweep of idle entries.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

pub struct SlidingWindow {
    window: Duration,
    max_requests: usize,
    buckets: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl SlidingWindow {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            buckets: Mutex::new(HashMap::default()),
        }
    }

    /// Records a request attempt for `key` and decides admission.
    pub fn check(&self, key: IpAddr) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: IpAddr, now: Instant) -> RateDecision {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if buckets.len() > SWEEP_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, hits| {
                hits.retain(|t| now.duration_since(*t) < window);
                !hits.is_empty()
            });
        }

        let hits = buckets.entry(key).or_default();
        hits.retain(|t| now.duration_since(*t) < self.window);

        if hits.len() >= self.max_requests {
            // Oldest surviving hit decides when a slot opens up again.
            let elapsed = hits.first().map_or(Duration::ZERO, |t| now.duration_since(*t));
            RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        } else {
            hits.push(now);
            RateDecision::Allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        Ipv4Addr::new(10, 0, 0, last).into()
    }

    #[test]
    fn allows_up_to_threshold_then_limits() {
        let limiter = SlidingWindow::new(Duration::from_secs(60), 3);
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_at(ip(1), now), RateDecision::Allowed);
        }
        assert!(matches!(
            limiter.check_at(ip(1), now),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = SlidingWindow::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert_eq!(limiter.check_at(ip(2), start), RateDecision::Allowed);
        assert_eq!(limiter.check_at(ip(2), start), RateDecision::Allowed);
        assert!(matches!(
            limiter.check_at(ip(2), start + Duration::from_secs(30)),
            RateDecision::Limited { .. }
        ));

        // Both hits fall out of the window after 60s.
        assert_eq!(
            limiter.check_at(ip(2), start + Duration::from_secs(61)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindow::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert_eq!(limiter.check_at(ip(3), now), RateDecision::Allowed);
        assert!(matches!(
            limiter.check_at(ip(3), now),
            RateDecision::Limited { .. }
        ));
        assert_eq!(limiter.check_at(ip(4), now), RateDecision::Allowed);
    }

    #[test]
    fn retry_after_counts_down_from_oldest_hit() {
        let limiter = SlidingWindow::new(Duration::from_secs(60), 1);
        let start = Instant::now();

        assert_eq!(limiter.check_at(ip(5), start), RateDecision::Allowed);
        let RateDecision::Limited { retry_after } =
            limiter.check_at(ip(5), start + Duration::from_secs(45))
        else {
            panic!("expected Limited");
        };
        assert_eq!(retry_after, Duration::from_secs(15));
    }
}
