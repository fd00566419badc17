use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One bucket per user and route template (`/api/admin/articles/{id}`, not the concrete path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    user_id: Uuid,
    route: String,
}

/// Sliding-window limiter for the admin API.
///
/// Buckets whose window has emptied are swept at most once per window.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<BucketKey, VecDeque<Instant>>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record a request; returns whether it is allowed and how many remain in the window.
    pub fn allow(&self, user_id: Uuid, route: &str) -> (bool, u32) {
        let now = Instant::now();
        self.sweep_if_due(now);

        let key = BucketKey {
            user_id,
            route: route.to_string(),
        };
        let mut hits = self.buckets.entry(key).or_default();
        while hits
            .front()
            .is_some_and(|instant| now.duration_since(*instant) >= self.window)
        {
            hits.pop_front();
        }

        let remaining = self
            .max_requests
            .saturating_sub(u32::try_from(hits.len()).unwrap_or(u32::MAX));
        if remaining == 0 {
            return (false, 0);
        }

        hits.push_back(now);
        (true, remaining.saturating_sub(1))
    }

    fn sweep_if_due(&self, now: Instant) {
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.duration_since(*last_sweep) < self.window {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        let window = self.window;
        self.buckets.retain(|_, hits| {
            hits.retain(|instant| now.duration_since(*instant) < window);
            !hits.is_empty()
        });
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_per_route() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(limiter.allow(u1, "/api/admin/articles"), (true, 1));
        assert_eq!(limiter.allow(u1, "/api/admin/articles"), (true, 0));
        assert_eq!(limiter.allow(u1, "/api/admin/articles"), (false, 0));

        assert!(limiter.allow(u1, "/api/admin/scheduled").0);
        assert!(limiter.allow(u2, "/api/admin/articles").0);
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(20), 1);
        let user = Uuid::new_v4();
        assert!(limiter.allow(user, "/r").0);
        assert!(!limiter.allow(user, "/r").0);
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow(user, "/r").0);
    }

    #[test]
    fn expired_buckets_are_swept() {
        let limiter = ApiRateLimiter::new(Duration::from_millis(200), 10);
        for user in 0..500 {
            limiter.allow(Uuid::from_u128(user), "/api/admin/articles/{id}");
        }
        assert_eq!(limiter.bucket_count(), 500);

        std::thread::sleep(Duration::from_millis(450));
        limiter.allow(Uuid::new_v4(), "/api/admin/articles/{id}");
        assert_eq!(limiter.bucket_count(), 1);
    }
}
