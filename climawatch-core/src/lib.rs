//! # climawatch-core
//!
//! The telemetry core of climawatch: per-channel rolling sample windows,
//! their snapshot persistence, and the debounced threshold alert used for
//! seismic vibration.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use climawatch_core::{
//!     AlertDebouncer, BufferConfig, ChannelRegistry, MemorySnapshotStore, Persister,
//! };
//! use climawatch_types::Channel;
//!
//! let registry = Arc::new(
//!     ChannelRegistry::from_channels(
//!         [Channel::builder("vibr", "clima/vibracion").unit("Hz").build()],
//!         BufferConfig::default(),
//!     )
//!     .unwrap(),
//! );
//! let mut alert = AlertDebouncer::default();
//!
//! // An incoming message: topic, raw payload, arrival time
//! let result = registry.route("clima/vibracion", b"1.4", 1_000);
//! if let climawatch_core::RouteResult::Routed { sample, .. } = result {
//!     assert!(alert.check(sample.value, sample.timestamp).fired());
//! }
//!
//! // Persist changed channels
//! let persister = Persister::new(registry.clone(), Arc::new(MemorySnapshotStore::new()));
//! persister.save_all();
//! ```
//!
//! ## Concurrency
//!
//! Each channel's buffer has its own lock; the registry itself is immutable
//! once built. Readers get owned copies, and snapshot I/O only happens after
//! the buffer lock is released.

mod alert;
mod buffer;
mod clock;
mod error;
mod persist;
mod registry;
mod store;

pub use alert::{AlertDebouncer, AlertDecision, DEFAULT_COOLDOWN_MS, DEFAULT_THRESHOLD};
pub use buffer::{BufferConfig, SampleBuffer, VisibleRange, DEFAULT_MAX_POINTS, DEFAULT_WINDOW_MS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, ParseError, StorageError};
pub use persist::{PersistPolicy, Persister, SaveSummary};
pub use registry::{parse_payload, ChannelRegistry, ChannelView, PersistOutcome, RouteResult};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

#[cfg(feature = "tokio")]
pub use persist::PersistHandle;

// Re-export types for convenience
pub use climawatch_types::{Channel, EpochMillis, Sample};
