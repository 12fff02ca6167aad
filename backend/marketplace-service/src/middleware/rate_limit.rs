//! Sliding-window rate limiting for the sensitive auth endpoints.
//!
//! The window store is behind a trait so deployments can swap the
//! process-local default for a shared backend without touching the
//! middleware. The default store keeps per-key timestamp vectors in a
//! DashMap and prunes expired entries on every check.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use dashmap::DashMap;
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;
use crate::error::AppError;

pub trait RateLimitStore: Send + Sync {
    /// Record a hit for `key` at `now` and report whether it is within
    /// the allowed budget for the window.
    fn check_and_record(&self, key: &str, now: Instant, window: Duration, max_requests: u32)
        -> bool;
}

/// Process-local store. Counters reset on restart and are not shared
/// across replicas.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: DashMap<String, Vec<Instant>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn check_and_record(
        &self,
        key: &str,
        now: Instant,
        window: Duration,
        max_requests: u32,
    ) -> bool {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < window);

        if entry.len() >= max_requests as usize {
            return false;
        }

        entry.push(now);
        true
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, settings: &RateLimitSettings) -> Self {
        Self {
            store,
            max_requests: settings.max_requests,
            window: Duration::from_secs(settings.window_secs),
        }
    }

    pub fn in_memory(settings: &RateLimitSettings) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), settings)
    }

    pub fn is_rate_limited(&self, key: &str) -> bool {
        !self
            .store
            .check_and_record(key, Instant::now(), self.window, self.max_requests)
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Per-client key: forwarded address when behind a proxy, else the peer
/// address, scoped by path so each endpoint gets its own budget.
fn client_key(req: &ServiceRequest) -> String {
    let ip = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.headers()
                .get("X-Real-IP")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        })
        .or_else(|| req.peer_addr().map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    format!("{}:{}", ip, req.path())
}

/// Rate limiting middleware factory
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            let key = client_key(&req);

            if limiter.is_rate_limited(&key) {
                tracing::warn!(key = %key, "rate limit exceeded");
                return Err(AppError::RateLimitExceeded.into());
            }

            let res = service.call(req).await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_requests: u32, window_secs: u64) -> RateLimitSettings {
        RateLimitSettings {
            max_requests,
            window_secs,
        }
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::in_memory(&settings(10, 60));
        for _ in 0..10 {
            assert!(!limiter.is_rate_limited("1.2.3.4:/api/auth/login"));
        }
        assert!(limiter.is_rate_limited("1.2.3.4:/api/auth/login"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::in_memory(&settings(2, 60));
        assert!(!limiter.is_rate_limited("a"));
        assert!(!limiter.is_rate_limited("a"));
        assert!(limiter.is_rate_limited("a"));
        assert!(!limiter.is_rate_limited("b"));
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let store = MemoryRateLimitStore::new();
        let window = Duration::from_secs(60);
        let past = Instant::now() - Duration::from_secs(120);

        for _ in 0..10 {
            assert!(store.check_and_record("k", past, window, 10));
        }
        // The old window has fully elapsed, so a fresh hit is admitted
        assert!(store.check_and_record("k", Instant::now(), window, 10));
    }

    #[test]
    fn test_store_is_injectable() {
        struct DenyAll;
        impl RateLimitStore for DenyAll {
            fn check_and_record(&self, _: &str, _: Instant, _: Duration, _: u32) -> bool {
                false
            }
        }

        let limiter = RateLimiter::new(Arc::new(DenyAll), &settings(10, 60));
        assert!(limiter.is_rate_limited("anything"));
    }
}
