use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

const AUTH_LIMIT: u32 = 5;
const AUTH_WINDOW: Duration = Duration::from_secs(60);
const PRUNE_EVERY: Duration = Duration::from_secs(300);

/// Fixed-window request budget per client key. Process-local, so every
/// instance enforces its own budget.
#[derive(Clone)]
pub struct RateLimitState {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    limit: u32,
    window: Duration,
}

struct Bucket {
    hits: u32,
    opened: Instant,
}

impl Bucket {
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        now.duration_since(self.opened) > window
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitState {
    /// The auth budget: 5 requests per minute per key.
    pub fn new() -> Self {
        Self::with_limit(AUTH_LIMIT, AUTH_WINDOW)
    }

    pub fn with_limit(limit: u32, window: Duration) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Counts one request against `key`. `Ok` carries the requests left in
    /// this window, `Err` how long until the window reopens.
    pub async fn hit(&self, key: &str) -> Result<u32, Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_owned()).or_insert(Bucket {
            hits: 0,
            opened: now,
        });

        if bucket.is_stale(now, self.window) {
            *bucket = Bucket {
                hits: 0,
                opened: now,
            };
        }
        if bucket.hits >= self.limit {
            return Err(self.window.saturating_sub(now.duration_since(bucket.opened)));
        }

        bucket.hits += 1;
        Ok(self.limit - bucket.hits)
    }

    /// Forgets keys idle for two windows and returns how many remain.
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let horizon = self.window * 2;
        let mut buckets = self.buckets.lock().await;
        buckets.retain(|_, bucket| !bucket.is_stale(now, horizon));
        buckets.len()
    }

    /// Prunes on a fixed interval for the life of the process.
    pub fn spawn_pruner(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_EVERY);
            loop {
                ticker.tick().await;
                let remaining = limiter.prune().await;
                tracing::debug!(remaining, "Pruned rate limit buckets");
            }
        });
    }
}

fn client_key(ip: IpAddr, path: &str) -> String {
    format!("{ip}:{path}")
}

/// Throttles the public auth routes per client IP and path.
pub async fn throttle_auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(addr.ip(), req.uri().path());

    match state.rate_limiter.hit(&key).await {
        Ok(left) => {
            tracing::debug!(key = %key, left, "Auth request admitted");
            Ok(next.run(req).await)
        }
        Err(wait) => {
            // Round up so clients never retry inside the closed window
            let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            tracing::warn!(key = %key, retry_after_secs, "Auth rate limit exceeded");
            Err(AppError::RateLimited { retry_after_secs })
        }
    }
}
