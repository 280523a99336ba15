//! Minimum-interval pacing between outbound calls
//!
//! The interval is measured from the *end* of the previous call, so a slow
//! response pushes the next request back instead of letting it fire right away.
//! The limiter stays locked while a permit is held, which serializes callers
//! that share one instance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Paces one family of outbound calls
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_run: Arc<Mutex<Option<Instant>>>,
}

/// Held for the duration of one call; dropping it stamps the completion time
#[derive(Debug)]
pub struct RatePermit {
    last_run: OwnedMutexGuard<Option<Instant>>,
}

impl Drop for RatePermit {
    fn drop(&mut self) {
        *self.last_run = Some(Instant::now());
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_run: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until `min_interval` has passed since the previous call finished
    pub async fn acquire(&self) -> RatePermit {
        let last_run = Arc::clone(&self.last_run).lock_owned().await;

        if let Some(last) = *last_run {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        RatePermit { last_run }
    }

    /// Run one paced call
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let _permit = self.acquire().await;
        call.await
    }
}
