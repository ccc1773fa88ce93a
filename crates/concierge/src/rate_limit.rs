use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket shared by every tool call on one server.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// `None` or zero disables limiting.
    pub fn new(rps: Option<u32>) -> Option<Self> {
        let rps = rps.filter(|&n| n > 0)?;
        Some(Self {
            rps,
            state: Arc::new(Mutex::new(Bucket {
                tokens: rps as f64,
                last: Instant::now(),
            })),
        })
    }

    pub async fn check(&self) -> Result<(), String> {
        let mut bucket = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last);
        bucket.last = now;

        let capacity = self.rps as f64;
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * capacity).min(capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / capacity);
        Err(format!(
            "rate limit exceeded (RATE_LIMIT_RPS={}): try again in ~{}ms",
            self.rps,
            wait.as_millis()
        ))
    }
}
