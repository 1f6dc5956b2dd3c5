//! Exponential backoff

use std::time::Duration;

/// `base × 2^attempt`, optionally capped
///
/// Uncapped unless `max_delay` is set. The exponent saturates instead of
/// overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Option<Duration>,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Option<Duration>) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after failed attempt `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(multiplier)
            .unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles() {
        let backoff = Backoff::new(Duration::from_millis(100), None);
        let delays: Vec<_> = (0..4).map(|n| backoff.delay(n).as_millis()).collect();
        assert_eq!(delays, [100, 200, 400, 800]);
    }

    #[test]
    fn test_delay_capped() {
        let backoff = Backoff::new(Duration::from_millis(100), Some(Duration::from_millis(300)));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(300));
        assert_eq!(backoff.delay(10), Duration::from_millis(300));
    }

    #[test]
    fn test_delay_saturates() {
        let backoff = Backoff::new(Duration::from_secs(1), None);
        assert_eq!(backoff.delay(64), Duration::from_secs(u64::from(u32::MAX)));
    }
}
