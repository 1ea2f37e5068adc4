//! Token bucket rate limiter for outbound inference requests.
//!
//! One token is one request. The bucket holds at most `burst` tokens and
//! refills at `rate` tokens per second, so with the default burst of 1 calls
//! are evenly paced at `1 / rate` seconds apart.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Shortest sleep between polls; keeps a sub-nanosecond deficit from spinning.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Shared, thread-safe token bucket.
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
    rate: f64,
    burst: f64,
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn refill(&mut self, rate: f64, burst: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.tokens = (self.tokens + elapsed * rate).min(burst);
    }
}

impl RateLimiter {
    /// `rate` must be positive; `burst` is clamped to at least 1.
    pub fn new(rate: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: burst,
                last_update: Instant::now(),
            }),
            rate,
            burst,
        }
    }

    /// Takes a token if one is available.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock();
        bucket.refill(self.rate, self.burst);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Waits until a token is available and takes it.
    ///
    /// Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let start = Instant::now();
        loop {
            let wait = {
                let mut bucket = self.bucket.lock();
                bucket.refill(self.rate, self.burst);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return start.elapsed();
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
            };
            tokio::time::sleep(wait.max(MIN_WAIT)).await;
        }
    }
}
