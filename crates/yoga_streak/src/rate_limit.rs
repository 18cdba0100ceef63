//! In-memory fixed-window rate limiter.
//!
//! Each key gets a counter that resets when its window elapses. Expired
//! windows are dropped by [`RateLimiter::sweep_at`], which
//! [`RateLimiter::spawn_sweeper`] runs periodically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window resets.
    pub retry_after: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let retry_after = self
            .window
            .saturating_sub(now.saturating_duration_since(entry.started));
        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - entry.count,
            retry_after,
        }
    }

    /// Drop every window that has expired at `now`. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Sweep expired windows every `every` on the current tokio runtime.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep_at(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, "swept expired rate-limit windows");
                }
            }
        })
    }
}
