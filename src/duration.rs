use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to milliseconds multiplier (order matters: "ms" before "m" and "s")
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Parse duration strings like "10m", "60s", "1.5s", "500ms", "1h"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration must be a non-negative number: {}", s);
            }
            return match Duration::try_from_secs_f64(val * multiplier / 1_000.0) {
                Ok(d) => Ok(d),
                Err(_) => bail!("Duration out of range: {}", s),
            };
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else if millis < 3_600_000 {
        format!("{:.1}m", d.as_secs_f64() / 60.0)
    } else {
        format!("{:.1}h", d.as_secs_f64() / 3_600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minutes() {
        let d = parse_duration("10m").unwrap();
        assert_eq!(d, Duration::from_secs(600));
    }

    #[test]
    fn test_parse_seconds() {
        let d = parse_duration("60s").unwrap();
        assert_eq!(d, Duration::from_secs(60));

        let d = parse_duration("1.5s").unwrap();
        assert_eq!(d.as_millis(), 1500);
    }

    #[test]
    fn test_parse_milliseconds() {
        let d = parse_duration("500ms").unwrap();
        assert_eq!(d.as_millis(), 500);
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_duration(" 2h ").unwrap(), Duration::from_secs(7200));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1e20h").is_err());
        assert!(parse_duration("inf s").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(600)), "10.0m");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1.5h");
    }
}
