//! Plain-text history log of the latest readings.
//!
//! Every tick the logger appends one block with a local timestamp and the
//! most recent value of each channel it has heard from:
//!
//! ```text
//! 2025-06-01T14:30:05-05:00:
//!   Temperatura: 21.5 °C
//!   Humedad: 63 %
//!
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use climawatch_types::{Channel, EpochMillis};
use tracing::debug;

use crate::AdapterError;

/// Appends the latest channel values to a history file.
#[derive(Debug)]
pub struct HistoryLogger {
    path: PathBuf,
    offset: FixedOffset,
    /// (id, label, unit) in log order.
    columns: Vec<(String, String, String)>,
    latest: HashMap<String, f64>,
}

impl HistoryLogger {
    /// Create a logger writing to `path` for the given channels.
    pub fn new<'a>(
        path: impl Into<PathBuf>,
        offset: FixedOffset,
        channels: impl IntoIterator<Item = &'a Channel>,
    ) -> Self {
        let columns = channels
            .into_iter()
            .map(|c| (c.id.clone(), c.label.clone(), c.unit.clone()))
            .collect();

        Self {
            path: path.into(),
            offset,
            columns,
            latest: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remember the latest value of a channel.
    ///
    /// Values for channels the logger was not built with are ignored.
    pub fn record(&mut self, id: &str, value: f64) -> bool {
        if !self.columns.iter().any(|(c, _, _)| c == id) {
            return false;
        }
        self.latest.insert(id.to_string(), value);
        true
    }

    /// Whether any value has been recorded yet.
    pub fn has_values(&self) -> bool {
        !self.latest.is_empty()
    }

    /// Format one history block for the instant `now_ms`.
    pub fn format_entry(&self, now_ms: EpochMillis) -> String {
        let stamp = DateTime::from_timestamp_millis(now_ms)
            .unwrap_or_default()
            .with_timezone(&self.offset)
            .format("%Y-%m-%dT%H:%M:%S%:z");

        let mut entry = format!("{}:\n", stamp);
        for (id, label, unit) in &self.columns {
            if let Some(value) = self.latest.get(id) {
                entry.push_str(&format!("  {}: {} {}\n", label, value, unit));
            }
        }
        entry.push('\n');
        entry
    }

    /// Append the current block to the history file.
    ///
    /// Nothing is written before the first value arrives.
    pub fn append(&self, now_ms: EpochMillis) -> Result<bool, AdapterError> {
        if !self.has_values() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(self.format_entry(now_ms).as_bytes())?;
        Ok(true)
    }

    /// Delete the history file. A missing file is not an error.
    pub fn reset(&self) -> Result<(), AdapterError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "history reset");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // 2025-06-01T19:30:05Z
    const NOW: i64 = 1_748_806_205_000;

    fn channels() -> Vec<Channel> {
        vec![
            Channel::builder("temp", "clima/temperatura")
                .label("Temperatura")
                .unit("°C")
                .build(),
            Channel::builder("hum", "clima/humedad")
                .label("Humedad")
                .unit("%")
                .build(),
        ]
    }

    fn logger(path: impl Into<PathBuf>) -> HistoryLogger {
        HistoryLogger::new(path, FixedOffset::west_opt(5 * 3600).unwrap(), &channels())
    }

    #[test]
    fn test_format_entry() {
        let mut log = logger("history.txt");
        log.record("hum", 63.0);
        log.record("temp", 21.5);

        assert_eq!(
            log.format_entry(NOW),
            "2025-06-01T14:30:05-05:00:\n  Temperatura: 21.5 °C\n  Humedad: 63 %\n\n"
        );
    }

    #[test]
    fn unknown_and_missing_channels_are_skipped() {
        let mut log = logger("history.txt");
        assert!(!log.record("vibr", 0.4));
        assert!(log.record("hum", 40.0));

        assert_eq!(
            log.format_entry(NOW),
            "2025-06-01T14:30:05-05:00:\n  Humedad: 40 %\n\n"
        );
    }

    #[test]
    fn test_append_and_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("history.txt");
        let mut log = logger(&path);

        // Nothing recorded, nothing written
        assert!(!log.append(NOW).unwrap());
        assert!(!path.exists());

        log.record("temp", 20.0);
        assert!(log.append(NOW).unwrap());
        log.record("temp", 20.5);
        assert!(log.append(NOW + 1000).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Temperatura:").count(), 2);
        assert!(content.contains("14:30:06-05:00:\n  Temperatura: 20.5 °C\n"));

        log.reset().unwrap();
        assert!(!path.exists());
        // Resetting twice is fine
        log.reset().unwrap();
    }
}
