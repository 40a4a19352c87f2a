//! Settings for the climawatch binary.
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables prefixed with `CLIMAWATCH_` (nested keys joined by `__`, e.g.
//! `CLIMAWATCH_ALERT__THRESHOLD=1.5`). Everything has a default, so an
//! empty configuration reproduces the stock six-sensor station.
//!
//! ```toml
//! utc_offset = "-05:00"
//!
//! [buffer]
//! window = "10m"
//! max_points = 6000
//!
//! [alert]
//! channel = "vibr"
//! threshold = 1.1
//! cooldown = "60s"
//!
//! [[channels]]
//! id = "temp"
//! topic = "clima/temperatura"
//! label = "Temperatura"
//! unit = "°C"
//! min = 10.0
//! max = 50.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use climawatch_core::{
    AlertDebouncer, BufferConfig, ChannelRegistry, ConfigError, PersistPolicy,
    DEFAULT_MAX_POINTS, DEFAULT_THRESHOLD,
};
use climawatch_types::Channel;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;

/// Value of `storage.persist` that saves after every sample.
pub const PERSIST_EVERY_PUSH: &str = "every_push";

/// Complete settings for one climawatch instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// UTC offset used for report dates and history timestamps.
    pub utc_offset: String,
    pub channels: Vec<ChannelSettings>,
    pub buffer: BufferSettings,
    pub alert: AlertSettings,
    pub storage: StorageSettings,
    pub reports: ReportSettings,
    pub history: HistorySettings,
}

/// One sensor channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_display_max")]
    pub max: f64,
}

fn default_display_max() -> f64 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    pub window: String,
    pub max_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub enabled: bool,
    pub channel: String,
    pub threshold: f64,
    pub cooldown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub snapshot_dir: PathBuf,
    /// `"every_push"` or a save interval such as `"1s"`.
    pub persist: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub dir: PathBuf,
    pub notify: bool,
    pub notify_every: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub path: PathBuf,
    pub interval: String,
    /// Channel ids left out of the history file.
    pub exclude: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            utc_offset: "-05:00".to_string(),
            channels: default_channels(),
            buffer: BufferSettings::default(),
            alert: AlertSettings::default(),
            storage: StorageSettings::default(),
            reports: ReportSettings::default(),
            history: HistorySettings::default(),
        }
    }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            window: "10m".to_string(),
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: "vibr".to_string(),
            threshold: DEFAULT_THRESHOLD,
            cooldown: "60s".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("snapshots"),
            persist: "1s".to_string(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            notify: true,
            notify_every: "10s".to_string(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("history.txt"),
            interval: "1s".to_string(),
            exclude: vec!["vibr".to_string()],
        }
    }
}

fn channel(id: &str, topic: &str, label: &str, unit: &str, min: f64, max: f64) -> ChannelSettings {
    ChannelSettings {
        id: id.to_string(),
        topic: topic.to_string(),
        label: Some(label.to_string()),
        unit: unit.to_string(),
        min,
        max,
    }
}

/// The station's stock sensors.
fn default_channels() -> Vec<ChannelSettings> {
    vec![
        channel("temp", "clima/temperatura", "Temperatura", "°C", 10.0, 50.0),
        channel("pres", "clima/presion", "Presión", "hPa", 0.0, 1100.0),
        channel("hum", "clima/humedad", "Humedad", "%", 0.0, 85.0),
        channel("soil", "clima/humedad_suelo", "Humedad suelo", "%", 0.0, 100.0),
        channel("light", "clima/lux", "Luz", "lux", 0.0, 5000.0),
        channel("vibr", "clima/vibracion", "Vibración", "Hz", 0.0, 2.0),
    ]
}

impl ChannelSettings {
    pub fn to_channel(&self) -> Channel {
        let mut builder = Channel::builder(&self.id, &self.topic)
            .unit(&self.unit)
            .display(self.min, self.max);
        if let Some(label) = &self.label {
            builder = builder.label(label);
        }
        builder.build()
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("CLIMAWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every setting that can be checked without touching the disk.
    pub fn validate(&self) -> Result<()> {
        self.buffer_config()?.validate()?;
        self.alert_debouncer()?;
        self.persist_policy()?;
        self.offset()?;
        self.notify_interval()?;
        self.history_interval()?;

        if self.alert.enabled && !self.channels.iter().any(|c| c.id == self.alert.channel) {
            return Err(ConfigError::UnknownChannel(self.alert.channel.clone()).into());
        }
        Ok(())
    }

    pub fn buffer_config(&self) -> Result<BufferConfig> {
        let window = parse_duration(&self.buffer.window).context("buffer.window")?;
        Ok(BufferConfig::new(window, self.buffer.max_points))
    }

    /// A fresh debouncer for the alert channel.
    pub fn alert_debouncer(&self) -> Result<AlertDebouncer> {
        let cooldown = parse_duration(&self.alert.cooldown).context("alert.cooldown")?;
        Ok(AlertDebouncer::new(self.alert.threshold, cooldown)?)
    }

    pub fn persist_policy(&self) -> Result<PersistPolicy> {
        if self.storage.persist.trim() == PERSIST_EVERY_PUSH {
            return Ok(PersistPolicy::EveryPush);
        }
        let interval = parse_duration(&self.storage.persist).context("storage.persist")?;
        let policy = PersistPolicy::Interval(interval);
        policy.validate()?;
        Ok(policy)
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset
            .parse::<FixedOffset>()
            .with_context(|| format!("invalid utc_offset: {}", self.utc_offset))
    }

    pub fn notify_interval(&self) -> Result<Duration> {
        let every = parse_duration(&self.reports.notify_every).context("reports.notify_every")?;
        non_zero(every, "reports.notify_every")
    }

    pub fn history_interval(&self) -> Result<Duration> {
        let every = parse_duration(&self.history.interval).context("history.interval")?;
        non_zero(every, "history.interval")
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.channels.iter().map(ChannelSettings::to_channel).collect()
    }

    /// Channels written to the history file.
    pub fn history_channels(&self) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|c| !self.history.exclude.contains(&c.id))
            .map(ChannelSettings::to_channel)
            .collect()
    }

    /// Build the registry for the configured channels.
    pub fn build_registry(&self) -> Result<ChannelRegistry> {
        let config = self.buffer_config()?;
        Ok(ChannelRegistry::from_channels(self.channels(), config)?)
    }
}

fn non_zero(every: Duration, key: &'static str) -> Result<Duration> {
    if every.is_zero() {
        return Err(ConfigError::ZeroInterval(key).into());
    }
    Ok(every)
}
