//! Sliding-window rate limiter.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of [`RateLimiter::try_acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The attempt was recorded in the window
    Allowed,
    /// The window is full; `retry_after` is the time until the oldest entry ages out
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Accepts at most `limit` attempts per trailing `window`
///
/// Entries are pruned lazily on every call; denial clears on its own as
/// entries age out.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    entries: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            entries: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Prune, count and conditionally record `now` as one atomic step
    pub fn try_acquire(&self, now: Instant) -> RateDecision {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(&oldest) = entries.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                entries.pop_front();
            } else {
                break;
            }
        }

        if entries.len() >= self.limit {
            if let Some(&oldest) = entries.front() {
                let age = now.saturating_duration_since(oldest);
                if age < self.window {
                    return RateDecision::Denied {
                        retry_after: self.window - age,
                    };
                }
            }
        }

        entries.push_back(now);
        RateDecision::Allowed
    }

    /// Entries currently retained (not pruned)
    pub fn in_window(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
