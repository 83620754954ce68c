use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket per upstream host. Capacity equals the per-second rate.
#[derive(Debug)]
pub struct HostRateLimiter {
    rate_per_sec: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl HostRateLimiter {
    pub fn new(rate_per_sec: u32) -> Self {
        Self {
            rate_per_sec: f64::from(rate_per_sec.max(1)),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a token for `host` is available and takes it.
    pub async fn acquire(&self, host: &str) {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let now = Instant::now();
                let bucket = buckets.entry(host.to_string()).or_insert(Bucket {
                    tokens: self.rate_per_sec,
                    refilled_at: now,
                });

                let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.rate_per_sec);
                bucket.refilled_at = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate_per_sec)
            };

            tracing::debug!("Rate limit reached for {}, waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let limiter = HostRateLimiter::new(5);
        let started = Instant::now();
        for _ in 0..5 {
            limiter.acquire("rest.example.com").await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn exhausted_bucket_waits_for_refill() {
        let limiter = HostRateLimiter::new(10);
        for _ in 0..10 {
            limiter.acquire("rest.example.com").await;
        }
        let started = Instant::now();
        limiter.acquire("rest.example.com").await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn hosts_have_separate_buckets() {
        let limiter = HostRateLimiter::new(1);
        limiter.acquire("a.example.com").await;
        let started = Instant::now();
        limiter.acquire("b.example.com").await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
