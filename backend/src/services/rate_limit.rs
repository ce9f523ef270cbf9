//! In-memory rate limiter for the public endpoints
//!
//! Sliding-window counters keyed by arbitrary strings (client IP, LINE user
//! id). State lives in this process only: a restart resets every window, and
//! horizontally scaled instances each enforce an independent limit. That is
//! an accepted tradeoff for these endpoints, not a correctness bug.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

struct LimiterStore {
    entries: HashMap<String, WindowEntry>,
    last_cleanup: Instant,
}

/// Sliding-window rate limiter with bounded memory.
///
/// Constructed once and shared via `Arc` in application state; tests build
/// their own instances and drive the clock explicitly through `check_at`.
pub struct RateLimiter {
    store: Mutex<LimiterStore>,
    max_entries: usize,
    cleanup_interval: Duration,
}

impl RateLimiter {
    pub fn new(max_entries: usize, cleanup_interval: Duration) -> Self {
        Self {
            store: Mutex::new(LimiterStore {
                entries: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
            max_entries,
            cleanup_interval,
        }
    }

    /// Check `key` against a limit of `max_requests` per `window`.
    pub fn check(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitDecision {
        self.check_at(key, max_requests, window, Instant::now())
    }

    /// Clock-injected variant of [`check`](Self::check).
    pub fn check_at(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> RateLimitDecision {
        let mut store = match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        self.maybe_cleanup(&mut store, now);

        if let Some(entry) = store.entries.get_mut(key) {
            if entry.reset_at > now {
                if entry.count >= max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        retry_after: entry.reset_at - now,
                    };
                }
                entry.count += 1;
                return RateLimitDecision {
                    allowed: true,
                    remaining: max_requests - entry.count,
                    retry_after: Duration::ZERO,
                };
            }
        }

        // New window for this key
        if store.entries.len() >= self.max_entries && !store.entries.contains_key(key) {
            Self::evict_oldest(&mut store, self.max_entries.saturating_sub(1));
        }
        store.entries.insert(
            key.to_string(),
            WindowEntry {
                count: 1,
                reset_at: now + window,
            },
        );

        RateLimitDecision {
            allowed: true,
            remaining: max_requests.saturating_sub(1),
            retry_after: Duration::ZERO,
        }
    }

    /// Drop expired windows, at most once per cleanup interval.
    fn maybe_cleanup(&self, store: &mut LimiterStore, now: Instant) {
        if now.duration_since(store.last_cleanup) < self.cleanup_interval {
            return;
        }
        store.last_cleanup = now;
        store.entries.retain(|_, entry| entry.reset_at > now);
    }

    /// Evict entries nearest to expiry until at most `target` remain.
    fn evict_oldest(store: &mut LimiterStore, target: usize) {
        while store.entries.len() > target {
            let oldest = store
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.reset_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    store.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of tracked keys (for tests and diagnostics).
    pub fn tracked_keys(&self) -> usize {
        match self.store.lock() {
            Ok(guard) => guard.entries.len(),
            Err(poisoned) => poisoned.into_inner().entries.len(),
        }
    }
}

/// Extract the client IP used as a rate-limit key.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(100, Duration::from_secs(60))
    }

    #[test]
    fn test_allows_up_to_max_within_window() {
        let limiter = limiter();
        let now = Instant::now();
        let window = Duration::from_secs(60);

        for i in 0..5 {
            let decision = limiter.check_at("ip:link:203.0.113.1", 5, window, now);
            assert!(decision.allowed, "request {} should be allowed", i + 1);
            assert_eq!(decision.remaining, 4 - i);
        }

        let decision = limiter.check_at("ip:link:203.0.113.1", 5, window, now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.retry_after > Duration::ZERO);
    }

    #[test]
    fn test_window_expiry_starts_fresh() {
        let limiter = limiter();
        let now = Instant::now();
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            limiter.check_at("k", 3, window, now);
        }
        assert!(!limiter.check_at("k", 3, window, now).allowed);

        let later = now + window + Duration::from_millis(1);
        let decision = limiter.check_at("k", 3, window, later);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[test]
    fn test_retry_after_counts_down_to_window_end() {
        let limiter = limiter();
        let now = Instant::now();
        let window = Duration::from_secs(60);

        limiter.check_at("k", 1, window, now);
        let blocked = limiter.check_at("k", 1, window, now + Duration::from_secs(10));
        assert!(!blocked.allowed);
        assert_eq!(blocked.retry_after, Duration::from_secs(50));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter();
        let now = Instant::now();
        let window = Duration::from_secs(60);

        limiter.check_at("a", 1, window, now);
        assert!(!limiter.check_at("a", 1, window, now).allowed);
        assert!(limiter.check_at("b", 1, window, now).allowed);
    }

    #[test]
    fn test_cleanup_runs_at_most_once_per_interval() {
        let limiter = RateLimiter::new(100, Duration::from_secs(60));
        let now = Instant::now();
        let window = Duration::from_secs(1);

        limiter.check_at("stale", 5, window, now);
        // Window expired but the cleanup interval has not elapsed
        limiter.check_at("fresh", 5, window, now + Duration::from_secs(2));
        assert_eq!(limiter.tracked_keys(), 2);

        // After the interval the stale entry is dropped
        limiter.check_at("fresh", 5, window, now + Duration::from_secs(61));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_capacity_evicts_nearest_to_expiry() {
        let limiter = RateLimiter::new(3, Duration::from_secs(3600));
        let now = Instant::now();

        limiter.check_at("expires-first", 5, Duration::from_secs(10), now);
        limiter.check_at("expires-second", 5, Duration::from_secs(20), now);
        limiter.check_at("expires-third", 5, Duration::from_secs(30), now);
        assert_eq!(limiter.tracked_keys(), 3);

        // Inserting a fourth key evicts the entry closest to its reset
        limiter.check_at("newcomer", 5, Duration::from_secs(40), now);
        assert_eq!(limiter.tracked_keys(), 3);

        // "expires-first" was evicted, so its next check starts a new window
        let decision = limiter.check_at("expires-first", 5, Duration::from_secs(10), now);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn test_client_ip_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");

        headers.insert("x-real-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.7");

        headers.insert(
            "x-forwarded-for",
            "203.0.113.9, 198.51.100.7".parse().unwrap(),
        );
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }
}
