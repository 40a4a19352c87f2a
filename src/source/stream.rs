//! Stream-based message source.
//!
//! Reads `<topic> <payload>` lines from an async byte stream: a TCP
//! connection to a broker bridge, stdin piped from `mosquitto_sub -v`, or a
//! recorded file being replayed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::{MessageSource, RawMessage};

/// Error state shared with the reader task.
#[derive(Debug, Default)]
struct Shared {
    last_error: Mutex<Option<String>>,
    malformed: AtomicU64,
}

impl Shared {
    fn set_error(&self, error: Option<String>) {
        *self.last_error.lock() = error;
    }
}

/// A message source reading lines from an async stream.
///
/// A background task reads the stream and forwards every well-formed line.
/// Malformed lines are counted and skipped.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use climawatch::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = b"clima/temperatura 21.5\n";
/// let stream = Cursor::new(data.to_vec());
/// let source = StreamSource::spawn(stream, "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<RawMessage>,
    description: String,
    shared: Arc<Shared>,
    closed: bool,
}

impl StreamSource {
    /// Spawn a background task that reads from the given async reader.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(256);
        let shared = Arc::new(Shared::default());
        let task_shared = shared.clone();
        let desc = description.to_string();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        task_shared.set_error(Some("Connection closed".to_string()));
                        break;
                    }
                    Ok(_) => match RawMessage::parse_line(&line) {
                        Some(message) => {
                            if tx.send(message).await.is_err() {
                                // Receiver dropped
                                break;
                            }
                        }
                        None if line.trim().is_empty() => {}
                        None => {
                            task_shared.malformed.fetch_add(1, Ordering::Relaxed);
                            debug!(source = %desc, line = line.trim(), "skipping malformed line");
                        }
                    },
                    Err(e) => {
                        task_shared.set_error(Some(format!("Read error: {}", e)));
                        break;
                    }
                }
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            shared,
            closed: false,
        }
    }

    /// Number of lines skipped because they had no payload.
    pub fn malformed_lines(&self) -> u64 {
        self.shared.malformed.load(Ordering::Relaxed)
    }
}

impl MessageSource for StreamSource {
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
        self.shared.last_error.lock().clone()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
