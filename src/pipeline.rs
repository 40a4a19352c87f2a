//! The ingestion pipeline: route, alert, persist.
//!
//! [`Pipeline::ingest`] is the single entry point for incoming messages. It
//! is synchronous and cheap; the run loop calls it for every message a
//! [`MessageSource`](crate::MessageSource) yields.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use climawatch_adapters::{Notification, Notifier};
use climawatch_core::{
    AlertDebouncer, AlertDecision, ChannelRegistry, Clock, ConfigError, EpochMillis,
    PersistPolicy, Persister, RouteResult, Sample, SystemClock,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::source::RawMessage;

/// What happened to one ingested message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Pushed onto `channel`; `alert` is the debouncer's decision.
    Routed {
        channel: String,
        sample: Sample,
        alert: AlertDecision,
    },
    /// Unknown topic or malformed payload.
    Dropped,
}

/// Running totals for the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub routed: u64,
    pub dropped: u64,
    pub alerts: u64,
}

#[derive(Debug)]
struct AlertRule {
    channel: String,
    debouncer: Mutex<AlertDebouncer>,
}

/// Routes messages into the registry and raises debounced alerts.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use climawatch::{IngestOutcome, Pipeline, RawMessage};
/// use climawatch_adapters::LogNotifier;
/// use climawatch_core::{AlertDebouncer, BufferConfig, ChannelRegistry};
/// use climawatch_types::Channel;
///
/// let registry = ChannelRegistry::from_channels(
///     [Channel::builder("vibr", "clima/vibracion").build()],
///     BufferConfig::default(),
/// )
/// .unwrap();
/// let pipeline = Pipeline::new(Arc::new(registry), Arc::new(LogNotifier))
///     .with_alert("vibr", AlertDebouncer::default())
///     .unwrap();
///
/// let outcome = pipeline.ingest_at(&RawMessage::new("clima/vibracion", "1.6"), 0);
/// assert!(matches!(outcome, IngestOutcome::Routed { alert, .. } if alert.fired()));
/// ```
#[derive(Debug)]
pub struct Pipeline {
    registry: Arc<ChannelRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    alert: Option<AlertRule>,
    persister: Option<Persister>,
    policy: PersistPolicy,
    routed: AtomicU64,
    dropped: AtomicU64,
    alerts: AtomicU64,
}

impl Pipeline {
    /// Create a pipeline with no alert rule and no persistence.
    pub fn new(registry: Arc<ChannelRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry,
            notifier,
            clock: Arc::new(SystemClock),
            alert: None,
            persister: None,
            policy: PersistPolicy::default(),
            routed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
        }
    }

    /// Watch `channel` (id or topic) with `debouncer`.
    pub fn with_alert(mut self, channel: &str, debouncer: AlertDebouncer) -> Result<Self, ConfigError> {
        let id = self
            .registry
            .get(channel)
            .map(|c| c.id.clone())
            .ok_or_else(|| ConfigError::UnknownChannel(channel.to_string()))?;

        self.alert = Some(AlertRule {
            channel: id,
            debouncer: Mutex::new(debouncer),
        });
        Ok(self)
    }

    /// Persist through `persister`. Only [`PersistPolicy::EveryPush`] makes
    /// the pipeline save; interval saving is the persister's own task.
    pub fn with_persister(mut self, persister: Persister, policy: PersistPolicy) -> Self {
        self.persister = Some(persister);
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Channel id the alert rule watches, if any.
    pub fn alert_channel(&self) -> Option<&str> {
        self.alert.as_ref().map(|a| a.channel.as_str())
    }

    /// Ingest a message arriving now.
    pub fn ingest(&self, message: &RawMessage) -> IngestOutcome {
        self.ingest_at(message, self.clock.now_ms())
    }

    /// Ingest a message that arrived at `arrival`.
    pub fn ingest_at(&self, message: &RawMessage, arrival: EpochMillis) -> IngestOutcome {
        let (channel, sample) = match self.registry.route(&message.topic, &message.payload, arrival) {
            RouteResult::Routed { channel, sample } => (channel, sample),
            RouteResult::Unknown => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return IngestOutcome::Dropped;
            }
        };
        self.routed.fetch_add(1, Ordering::Relaxed);

        let alert = self.check_alert(&channel, sample);

        if self.policy == PersistPolicy::EveryPush {
            if let Some(persister) = &self.persister {
                save_now(persister, &channel);
            }
        }

        IngestOutcome::Routed {
            channel,
            sample,
            alert,
        }
    }

    fn check_alert(&self, channel: &str, sample: Sample) -> AlertDecision {
        let Some(rule) = self.alert.as_ref().filter(|r| r.channel == channel) else {
            return AlertDecision::None;
        };

        let (decision, threshold) = {
            let mut debouncer = rule.debouncer.lock();
            (debouncer.check(sample.value, sample.timestamp), debouncer.threshold())
        };

        if decision.fired() {
            self.alerts.fetch_add(1, Ordering::Relaxed);
            info!(channel, value = sample.value, "threshold crossed, sending alert");
            if let Err(e) = self.notifier.notify(&Notification::seismic_alert()) {
                warn!(error = %e, "alert notification failed");
            }
        } else if sample.value > threshold {
            debug!(channel, value = sample.value, "alert suppressed by cooldown");
        }
        decision
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            routed: self.routed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
        }
    }
}

/// Save one channel, on the blocking pool when inside a tokio runtime.
///
/// Saves that finish out of order are harmless: the registry skips a copy
/// older than what was already written.
fn save_now(persister: &Persister, channel: &str) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let persister = persister.clone();
            let channel = channel.to_string();
            handle.spawn_blocking(move || persister.save_channel(&channel));
        }
        Err(_) => {
            persister.save_channel(channel);
        }
    }
}
