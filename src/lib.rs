//! # climawatch
//!
//! Home weather telemetry: keeps a rolling window of readings for each
//! sensor channel, persists those windows across restarts, raises a
//! debounced seismic alert when vibration crosses a threshold, and surfaces
//! the daily reports produced by an external service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   RawMessage   ┌──────────┐  route   ┌──────────────────┐
//! │  source  │───────────────▶│ pipeline │─────────▶│ ChannelRegistry  │
//! │ (input)  │                │          │          │ (SampleBuffers)  │
//! └──────────┘                └────┬─────┘          └────────┬─────────┘
//!                                  │ check                   │ persist
//!                                  ▼                         ▼
//!                           ┌──────────────┐         ┌───────────────┐
//!                           │AlertDebouncer│         │ SnapshotStore │
//!                           │  → Notifier  │         │               │
//!                           └──────────────┘         └───────────────┘
//! ```
//!
//! - **[`source`]**: Message source abstraction ([`MessageSource`]) with
//!   line-stream and channel implementations
//! - **[`pipeline`]**: Routes each message, checks the alert rule and
//!   applies the persistence policy
//! - **[`config`]**: Settings loaded from TOML and the environment
//! - **[`app`]**: Helpers the run loops share: draining sources, status
//!   lines, JSON export
//!
//! The buffers, stores and debouncer live in `climawatch-core`;
//! notifications, reports and the history log in `climawatch-adapters`.
//!
//! ## Usage
//!
//! ```bash
//! # Ingest readings printed by an MQTT client
//! mosquitto_sub -h broker -t 'clima/#' -v | climawatch run --stdin
//!
//! # Log the latest readings every second, starting a fresh file
//! climawatch log --connect bridge:1884 --reset
//!
//! # Show the last week of daily reports
//! climawatch reports --days 7
//! ```

pub mod app;
pub mod config;
pub mod duration;
pub mod pipeline;
pub mod source;

// Re-export main types for convenience
pub use app::{drain, export_json, status_lines};
pub use config::Settings;
pub use pipeline::{IngestOutcome, Pipeline, PipelineStats};
pub use source::{ChannelSource, MessageSource, RawMessage, StreamSource};
