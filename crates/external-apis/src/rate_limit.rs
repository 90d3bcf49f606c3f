// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-provider minimum request interval

use std::time::Duration;

use tokio::{
    sync::Mutex,
    time::{Instant, sleep_until},
};
use tracing::trace;

/// Spaces outbound calls of one provider instance at least `interval` apart
///
/// Waiting is the only suspension point and is cancel-safe: dropping an
/// `acquire` future before it completes leaves the clock untouched, so a
/// caller-level timeout never consumes a slot.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter; a zero interval disables limiting
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Creates a limiter from a possibly fractional number of seconds
    ///
    /// Negative and non-finite values disable limiting.
    pub fn from_secs_f64(seconds: f64) -> Self {
        let interval = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);
        Self::new(interval)
    }

    /// Configured interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the interval since the previous call has elapsed
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                trace!(
                    wait_ms = (ready_at - Instant::now()).as_millis(),
                    "rate limit wait"
                );
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
