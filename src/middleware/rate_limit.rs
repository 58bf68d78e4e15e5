use crate::auth::verify_access_token;
use crate::error::AppError;
use crate::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window rate limiter keyed per client
pub struct RateLimiter {
    /// Timestamps of recent requests per client key
    buckets: Mutex<HashMap<String, Vec<Instant>>>,
    /// Window duration
    window: Duration,
    /// Maximum requests per window
    max_requests: usize,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            window,
            max_requests,
        }
    }

    /// Check if a request can be made for this client, and if so, record it
    pub async fn acquire(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let cutoff = now - self.window;

        // Drop clients whose whole window has drained
        buckets.retain(|_, times| times.iter().any(|&t| t > cutoff));

        let times = buckets.entry(key.to_string()).or_default();
        times.retain(|&t| t > cutoff);

        if times.len() < self.max_requests {
            times.push(now);
            true
        } else {
            false
        }
    }

    /// Seconds until the client's oldest request leaves the window
    pub async fn retry_after_secs(&self, key: &str) -> u64 {
        let buckets = self.buckets.lock().await;
        let Some(times) = buckets.get(key) else {
            return 1;
        };
        let Some(oldest) = times.first() else {
            return 1;
        };

        let available_at = *oldest + self.window;
        let now = Instant::now();
        if available_at > now {
            (available_at - now).as_secs().max(1)
        } else {
            1
        }
    }
}

/// Reject clients that exceed the per-window request budget with 429
///
/// Authenticated requests share a budget per account, everything else per
/// source IP. The health endpoint stays exempt so probes are never
/// throttled.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.uri().path() == "/healthz" {
        return Ok(next.run(request).await);
    }

    let key = bearer_subject(&state, request.headers())
        .unwrap_or_else(|| addr.ip().to_string());
    if !state.rate_limiter.acquire(&key).await {
        let retry_after = state.rate_limiter.retry_after_secs(&key).await;
        return Err(AppError::RateLimited(retry_after));
    }

    Ok(next.run(request).await)
}

/// User id from a valid bearer token, if one is present
///
/// Invalid tokens fall back to IP keying here; the auth extractor rejects
/// them later.
fn bearer_subject(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    verify_access_token(&state.config.auth, token)
        .ok()
        .map(|claims| claims.sub.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_caps_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));

        assert!(limiter.acquire("10.0.0.1").await);
        assert!(limiter.acquire("10.0.0.1").await);
        assert!(limiter.acquire("10.0.0.1").await);

        // 4th request inside the window is rejected
        assert!(!limiter.acquire("10.0.0.1").await);

        // Other clients are unaffected
        assert!(limiter.acquire("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_rate_limiter_window_resets() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));

        assert!(limiter.acquire("10.0.0.1").await);
        assert!(limiter.acquire("10.0.0.1").await);
        assert!(!limiter.acquire("10.0.0.1").await);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(limiter.acquire("10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_retry_after_positive() {
        let limiter = RateLimiter::new(1, Duration::from_secs(30));

        assert!(limiter.acquire("10.0.0.1").await);
        assert!(!limiter.acquire("10.0.0.1").await);

        assert!(limiter.retry_after_secs("10.0.0.1").await >= 1);
    }
}
