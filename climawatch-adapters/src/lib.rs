//! # climawatch-adapters
//!
//! The collaborators around the climawatch core: notifications, daily
//! report files and the plain-text history log.
//!
//! ## Modules
//!
//! - [`notify`] - Builds the seismic alert and weather notifications and
//!   delivers them through a [`Notifier`]
//! - [`report`] - Reads `informe_YYYY-MM-DD.json` files written by the
//!   external report service
//! - [`history`] - Appends the latest readings to a history file
//!
//! ## Quick Start
//!
//! ```rust
//! use climawatch_adapters::{LogNotifier, Notification, Notifier};
//!
//! let notifier = LogNotifier;
//! notifier.notify(&Notification::seismic_alert()).unwrap();
//! ```

pub mod error;
pub mod history;
pub mod notify;
pub mod report;

pub use error::AdapterError;
pub use history::HistoryLogger;
pub use notify::{LogNotifier, Notification, Notifier};
pub use report::{render_report, ReportStore};

#[cfg(feature = "tokio")]
pub use notify::ChannelNotifier;

// Re-export types for convenience
pub use climawatch_types::{DailyReport, VariableSummary};
