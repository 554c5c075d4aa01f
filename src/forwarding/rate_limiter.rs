use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// per-destination token bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub per_minute: f64,
    pub burst: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

fn refill(bucket: &mut Bucket, limit: &RateLimit, now: Instant) {
    let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
    let refill_rate = limit.per_minute / 60.0;
    bucket.tokens = (bucket.tokens + elapsed * refill_rate).min(limit.burst);
    bucket.last_refill = now;
}

/// local, in-memory token-bucket limiter per destination, adapted from the
/// pack's NATS-backed `LocalBackpressureLimiter` with the JetStream branch
/// dropped — this service has no message bus to fall back to.
#[derive(Clone)]
pub struct DestinationRateLimiter {
    default_limit: RateLimit,
    buckets: Arc<Mutex<HashMap<i32, Bucket>>>,
}

impl DestinationRateLimiter {
    pub fn new(default_limit: RateLimit) -> Self {
        Self {
            default_limit,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// blocks until a token is available for `destination_id`, then consumes it.
    pub async fn acquire(&self, destination_id: i32) {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let bucket = buckets.entry(destination_id).or_insert_with(|| Bucket {
                    tokens: self.default_limit.burst,
                    last_refill: Instant::now(),
                });
                refill(bucket, &self.default_limit, Instant::now());
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    let refill_rate = self.default_limit.per_minute / 60.0;
                    let deficit = 1.0 - bucket.tokens;
                    Some(Duration::from_secs_f64((deficit / refill_rate).max(0.01)))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_burst_then_paces_remaining() {
        let limiter = DestinationRateLimiter::new(RateLimit { per_minute: 20.0, burst: 20.0 });
        let start = Instant::now();
        for _ in 0..20 {
            limiter.acquire(1).await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn separate_destinations_have_independent_buckets() {
        let limiter = DestinationRateLimiter::new(RateLimit { per_minute: 1.0, burst: 1.0 });
        limiter.acquire(1).await;
        let start = Instant::now();
        limiter.acquire(2).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
