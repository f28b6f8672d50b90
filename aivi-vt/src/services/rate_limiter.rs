//! Outbound request rate limiting
//!
//! Two bounds compose: a counting semaphore caps simultaneous in-flight
//! transcription calls, and a sliding 60-second log of request starts
//! smooths bursts so sustained throughput stays at the concurrency limit
//! per minute. First-come-first-served semaphore order; no other fairness
//! guarantee.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Length of the sliding request window
const WINDOW_SPAN: Duration = Duration::from_secs(60);

/// Rate limiter shared by all concurrent pipeline invocations
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    window: Mutex<VecDeque<Instant>>,
    limit: usize,
}

/// Held for the duration of one in-flight transcription call; dropping it
/// releases the concurrency slot.
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

impl RateLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            window: Mutex::new(VecDeque::new()),
            limit,
        }
    }

    /// Wait for a concurrency slot, then for room in the rolling window,
    /// record the request start, and return the slot guard.
    pub async fn acquire(&self) -> RatePermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("rate limiter semaphore is never closed");

        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();

                while let Some(&front) = window.front() {
                    if now.duration_since(front) >= WINDOW_SPAN {
                        window.pop_front();
                    } else {
                        break;
                    }
                }

                if window.len() >= self.limit {
                    // Sleep until the oldest entry falls out of the window
                    let oldest = *window
                        .front()
                        .expect("window holds at least `limit` entries");
                    WINDOW_SPAN - now.duration_since(oldest)
                } else {
                    window.push_back(now);
                    return RatePermit { _permit: permit };
                }
            };

            tracing::debug!(wait_seconds = wait.as_secs_f64(), "rate limiting: waiting");
            tokio::time::sleep(wait).await;
        }
    }
}
