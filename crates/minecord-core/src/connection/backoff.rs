use std::time::Duration;

/// First retry delay
pub const BACKOFF_FLOOR: Duration = Duration::from_millis(2_000);
/// Largest retry delay
pub const BACKOFF_CEILING: Duration = Duration::from_millis(30_000);
/// Growth factor between consecutive retries
pub const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Exponential reconnect backoff without jitter.
///
/// The n-th consecutive delay (0-based) is `min(floor * multiplier^n, ceiling)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    multiplier: f64,
    next: Duration,
}

impl Backoff {
    /// Create a backoff policy
    #[must_use]
    pub fn new(floor: Duration, ceiling: Duration, multiplier: f64) -> Self {
        let ceiling = ceiling.max(floor);
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            floor,
            ceiling,
            multiplier,
            next: floor,
        }
    }

    /// Back to the floor
    pub fn reset(&mut self) {
        self.next = self.floor;
    }

    /// Delay for the next retry; advances the policy
    pub fn next_delay(&mut self) -> Duration {
        let wait = self.next;
        self.next = self.grow(wait);
        wait
    }

    /// Delay the next call to [`Backoff::next_delay`] will return
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.next
    }

    /// Delay for the `attempt`-th consecutive retry (0-based), without state
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.floor.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.ceiling.as_secs_f64() {
            self.ceiling
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Floor delay
    #[must_use]
    pub fn floor(&self) -> Duration {
        self.floor
    }

    /// Ceiling delay
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    fn grow(&self, current: Duration) -> Duration {
        let secs = current.as_secs_f64() * self.multiplier;
        if !secs.is_finite() || secs >= self.ceiling.as_secs_f64() {
            self.ceiling
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_FLOOR, BACKOFF_CEILING, BACKOFF_MULTIPLIER)
    }
}
