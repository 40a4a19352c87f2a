//! Message source abstraction for receiving sensor readings.
//!
//! A source yields [`RawMessage`]s: a broker topic and the undecoded payload
//! bytes. Decoding and routing happen later, in the pipeline, so a source
//! never has to know which channels exist.

mod channel;
mod stream;

pub use channel::ChannelSource;
pub use stream::StreamSource;

use std::fmt::Debug;

/// One message as received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Parse a `<topic> <payload>` line, as printed by `mosquitto_sub -v`.
    ///
    /// Returns `None` for lines without a payload.
    ///
    /// ```
    /// use climawatch::RawMessage;
    ///
    /// let msg = RawMessage::parse_line("clima/temperatura 21.5\n").unwrap();
    /// assert_eq!(msg.topic, "clima/temperatura");
    /// assert_eq!(msg.payload, b"21.5");
    ///
    /// assert!(RawMessage::parse_line("clima/temperatura").is_none());
    /// ```
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let (topic, payload) = line.split_once(char::is_whitespace)?;
        let payload = payload.trim_start();
        if topic.is_empty() || payload.is_empty() {
            return None;
        }
        Some(Self::new(topic, payload.as_bytes()))
    }
}

/// Trait for receiving raw messages from various sources.
///
/// Implementations wrap a broker bridge, a line stream (TCP, stdin, a
/// recorded file) or an in-process channel.
pub trait MessageSource: Send + Debug {
    /// Poll for the next message.
    ///
    /// Returns `Some(message)` if one is waiting, `None` otherwise.
    /// This method must not block.
    fn poll(&mut self) -> Option<RawMessage>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// The last error the source ran into, if any.
    fn error(&self) -> Option<String>;

    /// Whether the source has ended and will never yield another message.
    fn is_closed(&self) -> bool {
        false
    }
}
