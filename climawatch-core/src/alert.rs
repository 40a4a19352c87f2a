//! Cooldown-gated threshold detector.

use std::time::Duration;

use climawatch_types::EpochMillis;

use crate::error::ConfigError;

/// Default vibration threshold above which a seismic alert fires.
pub const DEFAULT_THRESHOLD: f64 = 1.1;

/// Default minimum time between two alerts.
pub const DEFAULT_COOLDOWN_MS: i64 = 60_000;

/// Outcome of [`AlertDebouncer::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// Nothing to report.
    None,
    /// The caller should dispatch an alert.
    Fire,
}

impl AlertDecision {
    /// Whether the decision is [`AlertDecision::Fire`].
    pub fn fired(&self) -> bool {
        matches!(self, AlertDecision::Fire)
    }
}

/// Threshold detector with a cooldown between firings.
///
/// The debouncer only decides; dispatching the notification is up to the
/// caller. Over-threshold values that arrive during the cooldown are dropped,
/// not queued.
///
/// # Example
///
/// ```rust
/// use climawatch_core::{AlertDebouncer, AlertDecision};
/// use std::time::Duration;
///
/// let mut alert = AlertDebouncer::new(1.1, Duration::from_secs(60)).unwrap();
///
/// assert_eq!(alert.check(1.5, 0), AlertDecision::Fire);
/// assert_eq!(alert.check(1.5, 30_000), AlertDecision::None);
/// assert_eq!(alert.check(1.5, 61_000), AlertDecision::Fire);
/// ```
#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    threshold: f64,
    cooldown_ms: i64,
    /// `None` means "never fired", which behaves as negative infinity.
    last_fired_at: Option<EpochMillis>,
}

impl AlertDebouncer {
    /// Create a debouncer, rejecting a non-finite threshold.
    pub fn new(threshold: f64, cooldown: Duration) -> Result<Self, ConfigError> {
        let cooldown_ms = cooldown.as_millis().min(i64::MAX as u128) as i64;
        Self::with_millis(threshold, cooldown_ms)
    }

    /// Create a debouncer with the cooldown given in milliseconds.
    pub fn with_millis(threshold: f64, cooldown_ms: i64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        if cooldown_ms < 0 {
            return Err(ConfigError::InvalidCooldown(cooldown_ms));
        }
        Ok(Self {
            threshold,
            cooldown_ms,
            last_fired_at: None,
        })
    }

    /// Decide whether `value` observed at `now` should raise an alert.
    ///
    /// Fires iff `value > threshold` and at least `cooldown` has passed since
    /// the previous firing. Firing records `now` as the new reference point.
    pub fn check(&mut self, value: f64, now: EpochMillis) -> AlertDecision {
        if value <= self.threshold || value.is_nan() {
            return AlertDecision::None;
        }

        let cooled_down = match self.last_fired_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.cooldown_ms,
        };

        if cooled_down {
            self.last_fired_at = Some(now);
            AlertDecision::Fire
        } else {
            AlertDecision::None
        }
    }

    /// The threshold values must exceed.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The cooldown in milliseconds.
    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    /// When the last alert fired, if ever.
    pub fn last_fired_at(&self) -> Option<EpochMillis> {
        self.last_fired_at
    }
}

impl Default for AlertDebouncer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            last_fired_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_sequence() {
        let mut alert = AlertDebouncer::with_millis(1.1, 60_000).unwrap();

        assert_eq!(alert.check(1.5, 0), AlertDecision::Fire);
        assert_eq!(alert.check(1.5, 30_000), AlertDecision::None);
        assert_eq!(alert.check(1.5, 61_000), AlertDecision::Fire);
        assert_eq!(alert.last_fired_at(), Some(61_000));
    }

    #[test]
    fn below_threshold_never_fires() {
        let mut alert = AlertDebouncer::default();
        assert_eq!(alert.check(1.1, 0), AlertDecision::None);
        assert_eq!(alert.check(0.2, 1_000_000), AlertDecision::None);
        assert_eq!(alert.check(f64::NAN, 2_000_000), AlertDecision::None);
        assert!(alert.last_fired_at().is_none());
    }

    #[test]
    fn suppressed_values_do_not_extend_cooldown() {
        let mut alert = AlertDebouncer::with_millis(1.0, 1_000).unwrap();
        assert!(alert.check(2.0, 0).fired());
        assert!(!alert.check(2.0, 999).fired());
        // Cooldown measured from the last firing, not the last attempt
        assert!(alert.check(2.0, 1_000).fired());
    }

    #[test]
    fn below_threshold_during_cooldown_keeps_state() {
        let mut alert = AlertDebouncer::with_millis(1.0, 1_000).unwrap();
        assert!(alert.check(2.0, 0).fired());
        assert!(!alert.check(0.5, 5_000).fired());
        assert_eq!(alert.last_fired_at(), Some(0));
    }

    #[test]
    fn zero_cooldown_fires_every_time() {
        let mut alert = AlertDebouncer::with_millis(0.0, 0).unwrap();
        assert!(alert.check(1.0, 10).fired());
        assert!(alert.check(1.0, 10).fired());
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            AlertDebouncer::with_millis(f64::INFINITY, 0).unwrap_err(),
            ConfigError::InvalidThreshold(f64::INFINITY)
        );
        assert_eq!(
            AlertDebouncer::with_millis(1.0, -1).unwrap_err(),
            ConfigError::InvalidCooldown(-1)
        );
    }

    #[test]
    fn default_matches_seismic_settings() {
        let alert = AlertDebouncer::default();
        assert_eq!(alert.threshold(), 1.1);
        assert_eq!(alert.cooldown_ms(), 60_000);
        assert_eq!(
            AlertDebouncer::new(1.1, Duration::from_secs(60))
                .unwrap()
                .cooldown_ms(),
            60_000
        );
    }
}
