//! Fixed-window rate limiter middleware.
//!
//! Counts requests in the current epoch second and rejects the rest with
//! 429 once the configured limit is reached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

const COUNT_MASK: u64 = 0xFFFF_FFFF;

#[derive(Clone)]
pub struct RateLimiter {
    max_per_sec: u64,
    /// Window second (high 32 bits) and request count (low 32 bits),
    /// updated together so a window reset and its first count are one step.
    state: Arc<AtomicU64>,
}

impl RateLimiter {
    /// A limit of zero is treated as one request per second.
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_sec: max_per_sec.clamp(1, COUNT_MASK),
            state: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now)
    }

    fn try_acquire_at(&self, now: u64) -> bool {
        let window = now & COUNT_MASK;
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let count = if current >> 32 == window {
                (current & COUNT_MASK) + 1
            } else {
                1
            };
            if count > self.max_per_sec {
                return false;
            }
            let next = (window << 32) | count;
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        return next.run(req).await;
    }
    tracing::warn!(path = %req.uri().path(), "Rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "too_many_requests",
            "message": "Rate limit exceeded"
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_within_window() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.try_acquire_at(100));
        assert!(limiter.try_acquire_at(100));
        assert!(!limiter.try_acquire_at(100));
    }

    #[test]
    fn test_zero_limit_allows_one() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.try_acquire_at(100));
        assert!(!limiter.try_acquire_at(100));
    }

    #[test]
    fn test_concurrent_acquires_grant_exactly_the_limit() {
        let limiter = RateLimiter::new(100);
        // Seed a stale window so the first concurrent acquires race the reset.
        assert!(limiter.try_acquire_at(99));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..50).filter(|_| limiter.try_acquire_at(100)).count()
                })
            })
            .collect();
        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 100);
    }

    #[test]
    fn test_new_window_resets() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire_at(100));
        assert!(!limiter.try_acquire_at(100));
        assert!(limiter.try_acquire_at(101));
    }
}
