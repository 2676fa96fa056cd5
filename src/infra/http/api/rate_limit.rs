use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Full sweeps of idle buckets happen once per this many checks.
const SWEEP_EVERY: u64 = 256;

/// Sliding-window limiter keyed by client address and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
    checks: Arc<AtomicU64>,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Limited { retry_after: u64 },
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn check(&self, client: &str, route: &str) -> Admission {
        self.check_at(client, route, Instant::now())
    }

    fn check_at(&self, client: &str, route: &str, now: Instant) -> Admission {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }

        let window = self.window;
        let mut entry = self.buckets.entry(format!("{client}:{route}")).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        if entry.len() as u32 >= self.max_requests {
            // The oldest hit leaves the window first.
            let retry_after = entry
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return Admission::Limited {
                retry_after: retry_after.as_secs().max(1),
            };
        }

        entry.push(now);
        Admission::Allowed {
            remaining: self.max_requests - entry.len() as u32,
        }
    }

    /// Drop buckets whose hits have all left the window.
    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, hits| {
            hits.retain(|instant| now.duration_since(*instant) < window);
            !hits.is_empty()
        });
    }

    pub fn tracked_buckets(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_after_max_requests_in_window() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        assert_eq!(
            limiter.check_at("203.0.113.1", "/api/auth/signin", now),
            Admission::Allowed { remaining: 1 }
        );
        assert_eq!(
            limiter.check_at("203.0.113.1", "/api/auth/signin", now),
            Admission::Allowed { remaining: 0 }
        );
        assert!(matches!(
            limiter.check_at("203.0.113.1", "/api/auth/signin", now),
            Admission::Limited { retry_after: 60 }
        ));
    }

    #[test]
    fn buckets_are_independent_per_client_and_route() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        assert!(matches!(
            limiter.check_at("a", "/api/auth/signin", now),
            Admission::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("b", "/api/auth/signin", now),
            Admission::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check_at("a", "/api/public/contact", now),
            Admission::Allowed { .. }
        ));
    }

    #[test]
    fn hits_expire_with_the_window() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();
        limiter.check_at("a", "/x", start);
        assert!(matches!(
            limiter.check_at("a", "/x", start + Duration::from_secs(5)),
            Admission::Limited { retry_after: 5 }
        ));
        assert!(matches!(
            limiter.check_at("a", "/x", start + Duration::from_secs(11)),
            Admission::Allowed { .. }
        ));
    }

    #[test]
    fn idle_buckets_are_swept() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 5);
        let start = Instant::now();
        for n in 0..10 {
            limiter.check_at(&format!("198.51.100.{n}"), "/x", start);
        }
        assert_eq!(limiter.tracked_buckets(), 10);

        let later = start + Duration::from_secs(30);
        limiter.sweep(later);
        assert_eq!(limiter.tracked_buckets(), 0);

        limiter.check_at("198.51.100.1", "/x", later);
        assert_eq!(limiter.tracked_buckets(), 1);
    }

    #[test]
    fn sweeps_run_periodically_during_checks() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(10), 5);
        let start = Instant::now();
        limiter.check_at("stale", "/x", start);

        let later = start + Duration::from_secs(30);
        for _ in 0..SWEEP_EVERY {
            limiter.check_at("active", "/x", later);
        }
        assert_eq!(limiter.tracked_buckets(), 1);
    }
}
