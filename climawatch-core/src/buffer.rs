//! Time-windowed, size-capped sample buffer.
//!
//! Each channel owns one [`SampleBuffer`]. Every push appends at the tail,
//! then trims the head by time window and finally by point count, so the
//! buffer always holds the most recent readings of one rolling window.

use std::collections::VecDeque;
use std::time::Duration;

use climawatch_types::{EpochMillis, Sample};

use crate::error::ConfigError;

/// Default rolling window: ten minutes.
pub const DEFAULT_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Default cap on retained points.
pub const DEFAULT_MAX_POINTS: usize = 6000;

/// Window and cap parameters for a [`SampleBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Width of the rolling window in milliseconds.
    pub window_ms: i64,
    /// Maximum number of samples retained.
    pub max_points: usize,
}

impl BufferConfig {
    /// Create a config from a window duration and a point cap.
    pub fn new(window: Duration, max_points: usize) -> Self {
        Self {
            window_ms: window.as_millis().min(i64::MAX as u128) as i64,
            max_points,
        }
    }

    /// Reject non-positive windows and caps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_ms <= 0 {
            return Err(ConfigError::InvalidWindow(self.window_ms));
        }
        if self.max_points == 0 {
            return Err(ConfigError::InvalidMaxPoints);
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

/// The time span a renderer should display: `[start, end]`.
///
/// `end` is the timestamp of the most recent push; the range is fixed by the
/// window width regardless of how dense the samples are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: EpochMillis,
    pub end: EpochMillis,
}

impl VisibleRange {
    /// Whether `timestamp` falls inside the range (inclusive).
    pub fn contains(&self, timestamp: EpochMillis) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Bounded, time-windowed sequence of samples for one channel.
///
/// Samples are kept in arrival order. Window eviction uses the timestamp of
/// the sample just pushed as the right edge, so a late (out-of-order)
/// arrival is appended as-is and trims relative to its own timestamp.
///
/// # Example
///
/// ```rust
/// use climawatch_core::{BufferConfig, SampleBuffer};
///
/// let mut buffer = SampleBuffer::new(BufferConfig {
///     window_ms: 1_000,
///     max_points: 100,
/// })
/// .unwrap();
///
/// buffer.push(0, 1.0);
/// buffer.push(500, 2.0);
/// buffer.push(1_600, 3.0);
///
/// // 0 and 500 fell out of the [600, 1600] window
/// assert_eq!(buffer.len(), 1);
/// assert_eq!(buffer.visible_range().unwrap().start, 600);
/// ```
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    config: BufferConfig,
    samples: VecDeque<Sample>,
    latest: Option<EpochMillis>,
    generation: u64,
}

impl SampleBuffer {
    /// Create an empty buffer, validating the config.
    pub fn new(config: BufferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            samples: VecDeque::new(),
            latest: None,
            generation: 0,
        })
    }

    /// Append a sample, then trim by window and cap. Never fails.
    pub fn push(&mut self, timestamp: EpochMillis, value: f64) {
        self.samples.push_back(Sample::new(timestamp, value));
        self.latest = Some(timestamp);
        self.generation += 1;
        self.evict(timestamp);
    }

    /// Replace the contents wholesale and apply trim and cap once.
    ///
    /// The newest restored sample (the last one) becomes the window's right
    /// edge, as if the samples had been pushed in order.
    pub fn restore(&mut self, samples: impl IntoIterator<Item = Sample>) {
        self.samples = samples.into_iter().collect();
        self.latest = self.samples.back().map(|s| s.timestamp);
        self.generation += 1;
        if let Some(edge) = self.latest {
            self.evict(edge);
        }
    }

    /// Owned copy of the current samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Iterate over the current samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// The window ending at the most recent push, or `None` before any data.
    pub fn visible_range(&self) -> Option<VisibleRange> {
        self.latest.map(|end| VisibleRange {
            start: end.saturating_sub(self.config.window_ms),
            end,
        })
    }

    /// The most recently pushed sample still retained.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The window and cap this buffer enforces.
    pub fn config(&self) -> BufferConfig {
        self.config
    }

    /// Mutation counter, bumped by every push and restore.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn evict(&mut self, edge: EpochMillis) {
        let cutoff = edge.saturating_sub(self.config.window_ms);
        while let Some(front) = self.samples.front() {
            if front.is_before(cutoff) {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        if self.samples.len() > self.config.max_points {
            let excess = self.samples.len() - self.config.max_points;
            self.samples.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(window_ms: i64, max_points: usize) -> SampleBuffer {
        SampleBuffer::new(BufferConfig {
            window_ms,
            max_points,
        })
        .unwrap()
    }

    fn timestamps(buffer: &SampleBuffer) -> Vec<i64> {
        buffer.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn new_buffer_is_empty() {
        let b = buffer(1000, 10);
        assert!(b.is_empty());
        assert!(b.visible_range().is_none());
        assert!(b.latest().is_none());
        assert_eq!(b.generation(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let err = SampleBuffer::new(BufferConfig {
            window_ms: 0,
            max_points: 10,
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidWindow(0));

        let err = SampleBuffer::new(BufferConfig {
            window_ms: 1000,
            max_points: 0,
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxPoints);
    }

    #[test]
    fn config_from_duration() {
        let config = BufferConfig::new(Duration::from_secs(600), 6000);
        assert_eq!(config, BufferConfig::default());
    }

    #[test]
    fn window_invariant_holds_after_every_push() {
        let mut b = buffer(5_000, 1_000);
        let mut t = 0;
        for i in 0..500 {
            // Irregular spacing: bursts and gaps
            t += if i % 7 == 0 { 3_000 } else { 150 };
            b.push(t, i as f64);

            let cutoff = t - 5_000;
            assert!(b.iter().all(|s| s.timestamp >= cutoff));
        }
    }

    #[test]
    fn cap_invariant_holds_after_every_push() {
        let mut b = buffer(i64::MAX / 2, 25);
        for t in 0..200 {
            b.push(t, 0.0);
            assert!(b.len() <= 25);
        }
        assert_eq!(b.len(), 25);
        assert_eq!(b.iter().next().unwrap().timestamp, 175);
    }

    #[test]
    fn eviction_is_fifo_and_preserves_order() {
        let mut b = buffer(10, 3);
        for t in [0, 2, 4, 6, 8] {
            b.push(t, t as f64);
        }
        // Cap evicted 0 and 2
        assert_eq!(timestamps(&b), vec![4, 6, 8]);

        b.push(15, 15.0);
        // Window (cutoff 5) evicts 4, cap then keeps the last three
        assert_eq!(timestamps(&b), vec![6, 8, 15]);

        b.push(30, 30.0);
        // Window (cutoff 20) evicts everything older
        assert_eq!(timestamps(&b), vec![30]);
    }

    #[test]
    fn sample_exactly_on_cutoff_is_kept() {
        let mut b = buffer(1000, 10);
        b.push(0, 1.0);
        b.push(1000, 2.0);
        assert_eq!(timestamps(&b), vec![0, 1000]);

        b.push(1001, 3.0);
        assert_eq!(timestamps(&b), vec![1000, 1001]);
    }

    #[test]
    fn visible_range_tracks_last_push() {
        let mut b = buffer(600_000, 10);
        b.push(1_000_000, 1.0);
        let range = b.visible_range().unwrap();
        assert_eq!(range.start, 400_000);
        assert_eq!(range.end, 1_000_000);
        assert!(range.contains(400_000));
        assert!(!range.contains(1_000_001));
    }

    #[test]
    fn out_of_order_push_is_appended_not_sorted() {
        let mut b = buffer(1000, 10);
        b.push(5000, 1.0);
        b.push(4500, 2.0);
        assert_eq!(timestamps(&b), vec![5000, 4500]);
        // The right edge follows the last push, not the maximum
        assert_eq!(b.visible_range().unwrap().end, 4500);
    }

    #[test]
    fn restore_applies_trim_and_cap_once() {
        let mut b = buffer(100, 3);
        let samples: Vec<Sample> = [0, 50, 120, 150, 180, 200]
            .into_iter()
            .map(|t| Sample::new(t, t as f64))
            .collect();

        b.restore(samples);

        // Window edge 200, cutoff 100: drops 0 and 50; cap keeps last three
        assert_eq!(timestamps(&b), vec![150, 180, 200]);
        assert_eq!(b.visible_range().unwrap().end, 200);
        assert_eq!(b.generation(), 1);
    }

    #[test]
    fn restore_empty_clears_buffer() {
        let mut b = buffer(100, 3);
        b.push(10, 1.0);
        b.restore(Vec::new());
        assert!(b.is_empty());
        assert!(b.visible_range().is_none());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut b = buffer(1000, 10);
        b.push(1, 1.0);
        let snap = b.snapshot();
        b.push(2, 2.0);
        assert_eq!(snap, vec![Sample::new(1, 1.0)]);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn ten_minute_window_scenario() {
        let mut b = buffer(600_000, 6000);
        for i in 0..700 {
            b.push(i * 1000, i as f64);
        }

        let t_last = 699_000;
        let ts = timestamps(&b);
        assert!(ts.iter().all(|&t| t >= t_last - 600_000 && t <= t_last));
        assert_eq!(ts.first(), Some(&99_000));
        assert_eq!(ts.last(), Some(&t_last));
        assert_eq!(b.len(), 601);
        assert!(b.len() <= 6000);
    }
}
