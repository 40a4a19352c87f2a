//! Channel registry and sample routing.
//!
//! The registry maps a topic or channel id to that channel's buffer. It is
//! built once at startup and then only read: each buffer sits behind its own
//! lock, so ingestion on one channel never contends with another.

use std::collections::HashMap;

use climawatch_types::{Channel, EpochMillis, Sample};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::buffer::{BufferConfig, SampleBuffer, VisibleRange};
use crate::error::{ConfigError, ParseError, StorageError};
use crate::store::SnapshotStore;

/// Result of routing one raw message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    /// The value was pushed onto the named channel's buffer.
    Routed { channel: String, sample: Sample },
    /// Unknown topic or unparseable payload; nothing was mutated.
    Unknown,
}

impl RouteResult {
    /// The channel id the message was routed to, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            RouteResult::Routed { channel, .. } => Some(channel),
            RouteResult::Unknown => None,
        }
    }
}

/// Outcome of persisting one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A snapshot with this many samples was written.
    Saved(usize),
    /// Nothing changed since the last save.
    UpToDate,
    /// No such channel.
    Unknown,
}

/// Read-only view of a channel for the render/poll path.
#[derive(Debug, Clone)]
pub struct ChannelView {
    pub channel: Channel,
    pub samples: Vec<Sample>,
    pub range: Option<VisibleRange>,
}

impl ChannelView {
    /// The newest sample in the view.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.last().copied()
    }
}

/// A registered channel with its buffer and save bookkeeping.
#[derive(Debug)]
struct ChannelEntry {
    channel: Channel,
    buffer: RwLock<SampleBuffer>,
    /// Generation of the last snapshot written; held for the whole save so
    /// saves of one channel are serialised.
    saved: Mutex<Option<u64>>,
}

/// Parse a payload as a finite decimal number.
///
/// ```rust
/// use climawatch_core::parse_payload;
///
/// assert_eq!(parse_payload(b" 21.5\n"), Ok(21.5));
/// assert!(parse_payload(b"not-a-number").is_err());
/// ```
pub fn parse_payload(raw: &[u8]) -> Result<f64, ParseError> {
    let text = std::str::from_utf8(raw).map_err(|_| ParseError::Utf8)?;
    let text = text.trim();
    let value: f64 = text
        .parse()
        .map_err(|_| ParseError::NotANumber(text.to_string()))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::NotFinite(value))
    }
}

/// Maps topics and channel ids to channel buffers.
///
/// # Example
///
/// ```rust
/// use climawatch_core::{BufferConfig, ChannelRegistry, RouteResult, SampleBuffer};
/// use climawatch_types::Channel;
///
/// let mut registry = ChannelRegistry::new();
/// registry
///     .register(
///         Channel::builder("temp", "clima/temperatura").unit("°C").build(),
///         SampleBuffer::new(BufferConfig::default()).unwrap(),
///     )
///     .unwrap();
///
/// let result = registry.route("clima/temperatura", b"21.5", 1_000);
/// assert_eq!(result.channel(), Some("temp"));
///
/// assert_eq!(registry.route("clima/otro", b"1.0", 1_000), RouteResult::Unknown);
/// ```
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    entries: Vec<ChannelEntry>,
    /// Both ids and topics point at the entry index.
    by_key: HashMap<String, usize>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from channels sharing one buffer config.
    pub fn from_channels(
        channels: impl IntoIterator<Item = Channel>,
        config: BufferConfig,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for channel in channels {
            registry.register(channel, SampleBuffer::new(config)?)?;
        }
        Ok(registry)
    }

    /// Register a channel with its buffer.
    ///
    /// A channel whose id or topic is already taken is a configuration error.
    pub fn register(&mut self, channel: Channel, buffer: SampleBuffer) -> Result<(), ConfigError> {
        for key in [&channel.id, &channel.topic] {
            if self.by_key.contains_key(key) {
                return Err(ConfigError::DuplicateChannel(key.clone()));
            }
        }

        let index = self.entries.len();
        self.by_key.insert(channel.id.clone(), index);
        self.by_key.insert(channel.topic.clone(), index);
        self.entries.push(ChannelEntry {
            channel,
            buffer: RwLock::new(buffer),
            saved: Mutex::new(None),
        });
        Ok(())
    }

    /// Route a raw value to the channel named by `key` (topic or id).
    ///
    /// Unknown keys and malformed payloads return [`RouteResult::Unknown`]
    /// without touching any buffer.
    pub fn route(&self, key: &str, raw: &[u8], arrival: EpochMillis) -> RouteResult {
        let Some(entry) = self.entry(key) else {
            debug!(key, "unknown channel, dropping message");
            return RouteResult::Unknown;
        };

        let value = match parse_payload(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(channel = %entry.channel.id, error = %e, "malformed payload, dropping message");
                return RouteResult::Unknown;
            }
        };

        entry.buffer.write().push(arrival, value);

        RouteResult::Routed {
            channel: entry.channel.id.clone(),
            sample: Sample::new(arrival, value),
        }
    }

    /// Seed a channel's buffer from previously saved samples.
    ///
    /// The seeded state counts as already persisted.
    pub fn seed(&self, key: &str, samples: Vec<Sample>) -> Result<usize, ConfigError> {
        let entry = self
            .entry(key)
            .ok_or_else(|| ConfigError::UnknownChannel(key.to_string()))?;

        let mut buffer = entry.buffer.write();
        buffer.restore(samples);
        *entry.saved.lock() = Some(buffer.generation());
        Ok(buffer.len())
    }

    /// Seed every channel from `store`. Returns the number of samples loaded.
    pub fn restore_all(&self, store: &dyn SnapshotStore) -> usize {
        self.entries
            .iter()
            .map(|entry| {
                let samples = store.load(&entry.channel.id);
                let mut buffer = entry.buffer.write();
                buffer.restore(samples);
                *entry.saved.lock() = Some(buffer.generation());
                buffer.len()
            })
            .sum()
    }

    /// Persist one channel's buffer to `store`.
    ///
    /// The samples are copied out under the buffer's read lock, which is
    /// released before any I/O. Saves of the same channel are serialised
    /// and an older copy never overwrites a newer one.
    pub fn persist(&self, key: &str, store: &dyn SnapshotStore) -> Result<PersistOutcome, StorageError> {
        let Some(entry) = self.entry(key) else {
            return Ok(PersistOutcome::Unknown);
        };

        let (generation, samples) = {
            let buffer = entry.buffer.read();
            (buffer.generation(), buffer.snapshot())
        };

        let mut saved = entry.saved.lock();
        if matches!(*saved, Some(last) if last >= generation) {
            return Ok(PersistOutcome::UpToDate);
        }

        store.save(&entry.channel.id, &samples)?;
        *saved = Some(generation);
        Ok(PersistOutcome::Saved(samples.len()))
    }

    /// Look up a channel by topic or id.
    pub fn get(&self, key: &str) -> Option<&Channel> {
        self.entry(key).map(|e| &e.channel)
    }

    /// Registered channels in registration order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.entries.iter().map(|e| &e.channel)
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned view of one channel for rendering.
    pub fn view(&self, key: &str) -> Option<ChannelView> {
        self.entry(key).map(Self::view_of)
    }

    /// Owned views of all channels, in registration order.
    pub fn views(&self) -> Vec<ChannelView> {
        self.entries.iter().map(Self::view_of).collect()
    }

    /// Number of samples currently buffered for a channel.
    pub fn buffered(&self, key: &str) -> Option<usize> {
        self.entry(key).map(|e| e.buffer.read().len())
    }

    fn view_of(entry: &ChannelEntry) -> ChannelView {
        let buffer = entry.buffer.read();
        ChannelView {
            channel: entry.channel.clone(),
            samples: buffer.snapshot(),
            range: buffer.visible_range(),
        }
    }

    fn entry(&self, key: &str) -> Option<&ChannelEntry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }
}
