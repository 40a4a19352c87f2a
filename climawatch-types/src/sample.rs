//! Sample - a single timestamped sensor reading.

/// Milliseconds since the Unix epoch.
///
/// Signed so that window arithmetic (`end - window`) never underflows near
/// the epoch.
pub type EpochMillis = i64;

/// A single sensor reading.
///
/// Samples are immutable once created. They serialize as
/// `{"timestamp": <int>, "value": <float>}`, which is also the on-disk
/// snapshot record format.
///
/// # Example
///
/// ```rust
/// use climawatch_types::Sample;
///
/// let sample = Sample::new(1_700_000_000_000, 1013.2);
/// assert!(sample.is_before(1_700_000_000_001));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Sample {
    /// When the reading arrived, in epoch milliseconds.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub timestamp: EpochMillis,

    /// The reading itself, in the channel's unit.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    pub const fn new(timestamp: EpochMillis, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Whether this sample is strictly older than `timestamp`.
    pub fn is_before(&self, timestamp: EpochMillis) -> bool {
        self.timestamp < timestamp
    }
}

impl From<(EpochMillis, f64)> for Sample {
    fn from((timestamp, value): (EpochMillis, f64)) -> Self {
        Self { timestamp, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_from_tuple() {
        let sample: Sample = (42, 1.5).into();
        assert_eq!(sample, Sample::new(42, 1.5));
    }

    #[test]
    fn test_is_before() {
        let sample = Sample::new(1000, 0.0);
        assert!(sample.is_before(1001));
        assert!(!sample.is_before(1000));
        assert!(!sample.is_before(999));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_string(&Sample::new(1700000000000, 21.5)).unwrap();
        assert_eq!(json, r#"{"timestamp":1700000000000,"value":21.5}"#);

        let parsed: Sample = serde_json::from_str(r#"{"timestamp": -5, "value": 0.25}"#).unwrap();
        assert_eq!(parsed, Sample::new(-5, 0.25));
    }

    #[cfg(feature = "minicbor")]
    #[test]
    fn test_minicbor_roundtrip() {
        let sample = Sample::new(1700000000000, -3.75);

        let bytes = minicbor::to_vec(&sample).unwrap();
        let parsed: Sample = minicbor::decode(&bytes).unwrap();

        assert_eq!(sample, parsed);
    }
}
