//! Exponential reconnection backoff.

use std::time::Duration;

/// Default shortest delay.
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(1);

/// Default longest delay.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Doubling delay bounded to `[min, max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_MIN, DEFAULT_BACKOFF_MAX)
    }
}

impl Backoff {
    /// Create a backoff starting at `min`.
    ///
    /// If `max` is below `min` it is raised to `min`.
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Backoff {
            min,
            max,
            current: min,
        }
    }

    /// Delay to use now; the next call returns double, capped at `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Delay the next call to [`next_delay`](Self::next_delay) will return.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return to `min` after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubling_and_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::default();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_secs(4));
        backoff.reset();
        assert_eq!(backoff.next_delay(), DEFAULT_BACKOFF_MIN);
    }

    #[test]
    fn test_inverted_bounds() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }
}
