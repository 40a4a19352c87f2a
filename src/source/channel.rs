//! Channel-based message source.
//!
//! Receives raw messages via a tokio mpsc channel. This is the bridge for
//! an in-process broker client: the client pushes every message it
//! receives, and the run loop polls them from here.

use tokio::sync::mpsc;

use super::{MessageSource, RawMessage};

/// A message source fed through a channel.
///
/// # Example
///
/// ```
/// use climawatch::{ChannelSource, MessageSource, RawMessage};
///
/// let (tx, mut source) = ChannelSource::create("mqtt://broker", 64);
/// tx.try_send(RawMessage::new("clima/lux", "800")).unwrap();
/// assert!(source.poll().is_some());
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<RawMessage>,
    description: String,
    closed: bool,
}

impl ChannelSource {
    /// Create a new channel source.
    ///
    /// * `receiver` - The receiving end of an mpsc channel
    /// * `source_description` - Where the messages come from
    ///   (e.g. "mqtt://localhost:1883")
    pub fn new(receiver: mpsc::Receiver<RawMessage>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            closed: false,
        }
    }

    /// Create a channel pair holding up to `buffer` pending messages.
    ///
    /// Returns (sender, source).
    pub fn create(source_description: &str, buffer: usize) -> (mpsc::Sender<RawMessage>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx, source_description))
    }
}

impl MessageSource for ChannelSource {
    fn poll(&mut self) -> Option<RawMessage> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.closed.then(|| "Channel closed".to_string())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
