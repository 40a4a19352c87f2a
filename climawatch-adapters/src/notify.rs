//! Notifications: what to say, and where to send it.
//!
//! The core only decides *whether* to notify. This module builds the
//! notification text and hands it to a [`Notifier`], which stands in for
//! the desktop notification API.

use climawatch_types::DailyReport;
use tracing::{info, warn};

use crate::AdapterError;

/// Title of the seismic alert.
pub const SEISMIC_TITLE: &str = "ALERTA SÍSMICA 🚨";

/// Body of the seismic alert.
pub const SEISMIC_BODY: &str =
    "Se detectó una vibración superior al umbral de seguridad.\nRevise condiciones en el área.";

/// Icon shown with the seismic alert.
pub const SEISMIC_ICON: &str = "images/alert_noti.png";

/// Title of the periodic weather notification.
pub const REPORT_TITLE: &str = "Reporte Meteorológico";

/// Icon shown with the weather notification.
pub const REPORT_ICON: &str = "images/logo_noti.png";

/// Placeholder for a missing numeric value.
pub const MISSING_VALUE: &str = "--";

/// Placeholder for a missing text field.
pub const MISSING_TEXT: &str = "No disponible.";

/// A notification ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Icon reference understood by the host (a path or URL).
    pub icon: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: icon.into(),
        }
    }

    /// The alert sent when vibration crosses the safety threshold.
    pub fn seismic_alert() -> Self {
        Self::new(SEISMIC_TITLE, SEISMIC_BODY, SEISMIC_ICON)
    }

    /// The periodic weather summary built from today's report.
    ///
    /// Missing averages or summary never fail; placeholders are used.
    pub fn weather_report(report: &DailyReport) -> Self {
        let temp = format_average(report.average_temperature());
        let hum = format_average(report.average_humidity());
        let summary = report
            .resumen
            .as_deref()
            .map(|s| s.replace("<br>", " "))
            .unwrap_or_else(|| MISSING_TEXT.to_string());

        Self::new(
            REPORT_TITLE,
            format!("Temperatura: {}°C, Humedad: {}%. {}", temp, hum, summary),
            REPORT_ICON,
        )
    }
}

fn format_average(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => MISSING_VALUE.to_string(),
    }
}

/// Delivers notifications to the user.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn notify(&self, notification: &Notification) -> Result<(), AdapterError>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), AdapterError> {
        if notification.title == SEISMIC_TITLE {
            warn!(title = %notification.title, icon = %notification.icon, "{}", notification.body);
        } else {
            info!(title = %notification.title, icon = %notification.icon, "{}", notification.body);
        }
        Ok(())
    }
}

/// Sends notifications through a channel to whoever displays them.
///
/// Delivery is best effort: a full or closed channel is an error for the
/// caller to log, never a block.
///
/// ```rust
/// use climawatch_adapters::notify::{ChannelNotifier, Notification, Notifier};
///
/// let (notifier, mut rx) = ChannelNotifier::create(8);
/// notifier.notify(&Notification::seismic_alert()).unwrap();
/// assert_eq!(rx.try_recv().unwrap(), Notification::seismic_alert());
/// ```
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: tokio::sync::mpsc::Sender<Notification>,
}

#[cfg(feature = "tokio")]
impl ChannelNotifier {
    pub fn new(tx: tokio::sync::mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Create a notifier and the receiver its notifications arrive on.
    pub fn create(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<Notification>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[cfg(feature = "tokio")]
impl Notifier for ChannelNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), AdapterError> {
        self.tx
            .try_send(notification.clone())
            .map_err(|e| AdapterError::Delivery(e.to_string()))
    }
}
