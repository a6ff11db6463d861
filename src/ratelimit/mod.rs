use async_trait::async_trait;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Counter store failure. The limiter fails open on these.
#[derive(Debug, thiserror::Error)]
#[error("counter store unavailable: {0}")]
pub struct StoreError(pub String);

/// Shared fixed-window counter backend.
///
/// Injected rather than hardwired so the in-memory store can be swapped
/// for a shared KV backend without touching admission logic.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key`. The first increment in
    /// a window also arms the window expiry at `now + window`; later
    /// increments never extend it. Returns the post-increment count.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError>;

    /// Time remaining until the key's window expires.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;
}

struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// Single-process counter store: one async mutex makes increment-and-arm
/// race-free across concurrent requests from the same identity.
#[derive(Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, CounterEntry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(CounterEntry {
            count: 0,
            expires_at: now + window,
        });
        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }
        entry.count += 1;

        Ok(entry.count)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let entries = self.entries.lock().await;
        let now = Instant::now();

        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now))
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Epoch milliseconds at which the window resets
    pub reset_ms: u64,
    /// Whole seconds a denied caller should wait
    pub retry_after_secs: u64,
}

/// Fixed-window admission controller gating requests before expensive work.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, identity: &str, limit: u64, window: Duration) -> RateLimitDecision {
        let key = format!("rate_limit:{identity}");

        let count = match self.store.increment(&key, window).await {
            Ok(count) => count,
            Err(e) => {
                // Fail open: availability beats strictness when the
                // counter backend is down.
                tracing::warn!(identity, error = %e, "rate limit store failed, allowing request");
                return RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_ms: epoch_ms_after(window),
                    retry_after_secs: 0,
                };
            }
        };

        if count > limit {
            let ttl = self
                .store
                .ttl(&key)
                .await
                .ok()
                .flatten()
                .unwrap_or(window);
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_ms: epoch_ms_after(ttl),
                retry_after_secs: ttl.as_secs().max(1),
            };
        }

        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit - count,
            reset_ms: epoch_ms_after(window),
            retry_after_secs: 0,
        }
    }
}

fn epoch_ms_after(delay: Duration) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now + delay).as_millis() as u64
}

/// Best-effort client identity: first forwarded-for hop, then the
/// real-IP header, then a sentinel. Not cryptographically verified.
pub fn client_identity(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl CounterStore for FailingStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
            Err(StoreError("connection refused".into()))
        }

        async fn ttl(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
            Err(StoreError("connection refused".into()))
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()))
    }

    #[tokio::test]
    async fn test_requests_within_limit_allowed() {
        let limiter = limiter();
        let window = Duration::from_secs(60);

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check("1.2.3.4", 5, window).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
    }

    #[tokio::test]
    async fn test_request_over_limit_denied_with_zero_remaining() {
        let limiter = limiter();
        let window = Duration::from_secs(60);

        for _ in 0..5 {
            assert!(limiter.check("1.2.3.4", 5, window).await.allowed);
        }

        let denied = limiter.check("1.2.3.4", 5, window).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_secs >= 1);
        assert!(denied.retry_after_secs <= 60);
    }

    #[tokio::test]
    async fn test_identities_tracked_independently() {
        let limiter = limiter();
        let window = Duration::from_secs(60);

        for _ in 0..6 {
            limiter.check("1.2.3.4", 5, window).await;
        }
        let other = limiter.check("5.6.7.8", 5, window).await;
        assert!(other.allowed);
        assert_eq!(other.remaining, 4);
    }

    #[tokio::test]
    async fn test_window_expiry_restarts_count() {
        let limiter = limiter();
        let window = Duration::from_millis(50);

        for _ in 0..6 {
            limiter.check("1.2.3.4", 5, window).await;
        }
        assert!(!limiter.check("1.2.3.4", 5, window).await.allowed);

        tokio::time::sleep(Duration::from_millis(70)).await;

        let fresh = limiter.check("1.2.3.4", 5, window).await;
        assert!(fresh.allowed, "new window should admit again");
        assert_eq!(fresh.remaining, 4, "count restarts at 1");
    }

    #[tokio::test]
    async fn test_denied_requests_do_not_extend_window() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone());
        let window = Duration::from_millis(80);

        for _ in 0..6 {
            limiter.check("1.2.3.4", 5, window).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Denied mid-window; must not refresh expiry
        assert!(!limiter.check("1.2.3.4", 5, window).await.allowed);
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(limiter.check("1.2.3.4", 5, window).await.allowed);
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore));
        let decision = limiter.check("1.2.3.4", 5, Duration::from_secs(60)).await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_serialized() {
        let limiter = Arc::new(limiter());
        let window = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.check("1.2.3.4", 5, window).await.allowed
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 5, "exactly the limit may pass under contention");
    }

    #[test]
    fn test_client_identity_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "9.9.9.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "8.8.8.8".parse().unwrap());
        assert_eq!(client_identity(&headers), "9.9.9.9");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "8.8.8.8".parse().unwrap());
        assert_eq!(client_identity(&headers), "8.8.8.8");

        assert_eq!(client_identity(&HeaderMap::new()), "unknown");
    }
}
