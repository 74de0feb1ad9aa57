// src/limiter.rs
// =============================================================================
// A crawl-wide rate limiter.
//
// Every fetch, whichever worker issues it, first asks the limiter for a slot.
// Slots are handed out at least `interval` apart, so the whole crawl issues at
// most one request per interval no matter how wide the worker pool is.
//
// Reserving a slot is quick (a short lock around the next free instant); the
// actual waiting happens outside the lock, so waiters don't block each other
// beyond their place in line.
// =============================================================================

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // Waits until the caller may issue its request
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            // An interval too large to add means no further slot is ever
            // reachable in practice; park the next caller far in the future
            *next = Some(slot.checked_add(self.interval).unwrap_or_else(far_future));
            slot
        };

        sleep_until(slot).await;
    }
}

// Roughly 30 years, comfortably inside every platform's Instant range
fn far_future() -> Instant {
    let far = Duration::from_secs(86_400 * 365 * 30);
    let now = Instant::now();
    now.checked_add(far).unwrap_or(now)
}
