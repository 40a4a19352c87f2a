//! # climawatch-types
//!
//! Core types for home-weather telemetry. This crate defines the shared
//! schema used by the climawatch pipeline: timestamped sensor samples, the
//! static description of a sensor channel, and the daily report document
//! produced by the external report service.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Transport agnostic**: Samples can come from MQTT, a line stream, or a replay file
//! - **Ergonomic builders**: Fluent API for describing channels
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON serialization via serde (snapshot files, daily reports)
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use climawatch_types::{Channel, Sample};
//!
//! let channel = Channel::builder("temp", "clima/temperatura")
//!     .label("Temperatura")
//!     .unit("°C")
//!     .display(10.0, 50.0)
//!     .build();
//!
//! let sample = Sample::new(1_700_000_000_000, 21.5);
//!
//! assert_eq!(channel.topic, "clima/temperatura");
//! assert_eq!(sample.value, 21.5);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod report;
mod sample;

pub use channel::*;
pub use report::*;
pub use sample::*;
