//! Timer-driven snapshot persistence.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::ConfigError;
use crate::registry::{ChannelRegistry, PersistOutcome};
use crate::store::SnapshotStore;

/// When channel snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Save the channel right after every routed sample.
    EveryPush,
    /// Save changed channels on a fixed timer.
    Interval(Duration),
}

impl PersistPolicy {
    /// Reject a zero save interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PersistPolicy::Interval(every) if every.is_zero() => {
                Err(ConfigError::ZeroInterval("storage.persist"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for PersistPolicy {
    fn default() -> Self {
        PersistPolicy::Interval(Duration::from_secs(1))
    }
}

/// Counts from one [`Persister::save_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub saved: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

/// Writes channel snapshots to a store, one channel at a time.
///
/// Failures are logged and skipped; the next pass retries naturally because
/// the failed channel still has unsaved changes.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use climawatch_core::{BufferConfig, ChannelRegistry, MemorySnapshotStore, Persister};
/// use climawatch_types::Channel;
///
/// let registry = Arc::new(
///     ChannelRegistry::from_channels([Channel::builder("temp", "t").build()], BufferConfig::default())
///         .unwrap(),
/// );
/// let store = Arc::new(MemorySnapshotStore::new());
/// let persister = Persister::new(registry.clone(), store.clone());
///
/// registry.route("temp", b"20.0", 0);
/// assert_eq!(persister.save_all().saved, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Persister {
    registry: Arc<ChannelRegistry>,
    store: Arc<dyn SnapshotStore>,
}

impl Persister {
    /// Create a persister for every channel of `registry`.
    pub fn new(registry: Arc<ChannelRegistry>, store: Arc<dyn SnapshotStore>) -> Self {
        Self { registry, store }
    }

    /// The store snapshots are written to.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Save one channel if it changed. Returns `false` only on failure.
    pub fn save_channel(&self, channel_id: &str) -> bool {
        match self.registry.persist(channel_id, self.store.as_ref()) {
            Ok(outcome) => {
                if let PersistOutcome::Saved(n) = outcome {
                    debug!(channel = channel_id, samples = n, "persisted channel");
                }
                true
            }
            Err(e) => {
                warn!(channel = channel_id, error = %e, "snapshot save failed, will retry");
                false
            }
        }
    }

    /// Save every channel that changed since its last save.
    pub fn save_all(&self) -> SaveSummary {
        let mut summary = SaveSummary::default();
        let ids: Vec<String> = self.registry.channels().map(|c| c.id.clone()).collect();

        for id in ids {
            match self.registry.persist(&id, self.store.as_ref()) {
                Ok(PersistOutcome::Saved(_)) => summary.saved += 1,
                Ok(_) => summary.up_to_date += 1,
                Err(e) => {
                    warn!(channel = %id, error = %e, "snapshot save failed, will retry");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Start saving on a fixed interval in a background task.
    ///
    /// Store I/O runs on the blocking pool. A final pass runs when the
    /// returned handle is stopped. A zero `interval` is rejected.
    #[cfg(feature = "tokio")]
    pub fn start(&self, interval: Duration) -> Result<PersistHandle, ConfigError> {
        use tokio::sync::watch;

        PersistPolicy::Interval(interval).validate()?;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let persister = self.clone();

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        persister.save_all_blocking().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            let summary = persister.save_all_blocking().await;
            debug!(?summary, "final snapshot pass");
        });

        Ok(PersistHandle { stop_tx, task })
    }

    #[cfg(feature = "tokio")]
    async fn save_all_blocking(&self) -> SaveSummary {
        let persister = self.clone();
        match tokio::task::spawn_blocking(move || persister.save_all()).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "snapshot pass panicked");
                SaveSummary::default()
            }
        }
    }
}

/// Handle for the background persistence task.
///
/// Dropping the handle also stops the task (after its final pass).
#[cfg(feature = "tokio")]
#[derive(Debug)]
pub struct PersistHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "tokio")]
impl PersistHandle {
    /// Signal the task to stop without waiting for it.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the task and wait for its final save pass.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "persistence task failed, snapshots may be stale");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferConfig;
    use crate::error::StorageError;
    use crate::store::MemorySnapshotStore;
    use climawatch_types::{Channel, Sample};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<ChannelRegistry> {
        Arc::new(
            ChannelRegistry::from_channels(
                [
                    Channel::builder("temp", "clima/temperatura").build(),
                    Channel::builder("hum", "clima/humedad").build(),
                ],
                BufferConfig::default(),
            )
            .unwrap(),
        )
    }

    /// Store that fails the first `failures` saves.
    #[derive(Debug)]
    struct FlakyStore {
        inner: MemorySnapshotStore,
        failures: AtomicUsize,
    }

    impl SnapshotStore for FlakyStore {
        fn save(&self, channel_id: &str, samples: &[Sample]) -> Result<(), StorageError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(channel_id, samples)
        }

        fn load(&self, channel_id: &str) -> Vec<Sample> {
            self.inner.load(channel_id)
        }
    }

    #[test]
    fn save_all_counts_outcomes() {
        let registry = registry();
        let persister = Persister::new(registry.clone(), Arc::new(MemorySnapshotStore::new()));

        registry.route("temp", b"20", 0);
        let summary = persister.save_all();
        assert_eq!(
            summary,
            SaveSummary {
                saved: 1,
                up_to_date: 1,
                failed: 0
            }
        );

        assert_eq!(persister.save_all().saved, 0);
    }

    #[test]
    fn failed_save_is_retried_next_pass() {
        let registry = registry();
        let store = Arc::new(FlakyStore {
            inner: MemorySnapshotStore::new(),
            failures: AtomicUsize::new(1),
        });
        let persister = Persister::new(registry.clone(), store.clone());

        registry.route("temp", b"20", 0);
        assert_eq!(persister.save_all().failed, 1);
        assert!(store.load("temp").is_empty());

        // In-memory state is unaffected and the next pass succeeds
        assert_eq!(registry.buffered("temp"), Some(1));
        assert_eq!(persister.save_all().saved, 1);
        assert_eq!(store.load("temp"), vec![Sample::new(0, 20.0)]);
    }

    #[test]
    fn save_channel_reports_failure() {
        let registry = registry();
        let store = Arc::new(FlakyStore {
            inner: MemorySnapshotStore::new(),
            failures: AtomicUsize::new(1),
        });
        let persister = Persister::new(registry.clone(), store);

        registry.route("hum", b"55", 0);
        assert!(!persister.save_channel("hum"));
        assert!(persister.save_channel("hum"));
        assert!(persister.save_channel("unknown"));
    }

    #[tokio::test(start_paused = true)]
    async fn background_task_saves_on_interval() {
        let registry = registry();
        let store = Arc::new(MemorySnapshotStore::new());
        let persister = Persister::new(registry.clone(), store.clone());

        let handle = persister.start(Duration::from_secs(1)).unwrap();
        registry.route("temp", b"21.5", 1000);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.shutdown().await;

        assert_eq!(store.load("temp"), vec![Sample::new(1000, 21.5)]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_runs_final_pass() {
        let registry = registry();
        let store = Arc::new(MemorySnapshotStore::new());
        let persister = Persister::new(registry.clone(), store.clone());

        let handle = persister.start(Duration::from_secs(3600)).unwrap();
        // Let the immediate first tick pass
        tokio::task::yield_now().await;

        registry.route("hum", b"60", 5);
        handle.shutdown().await;

        assert_eq!(store.load("hum"), vec![Sample::new(5, 60.0)]);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let persister = Persister::new(registry(), Arc::new(MemorySnapshotStore::new()));

        let err = persister.start(Duration::ZERO).unwrap_err();
        assert_eq!(err, ConfigError::ZeroInterval("storage.persist"));
        assert!(PersistPolicy::Interval(Duration::ZERO).validate().is_err());
        assert!(PersistPolicy::Interval(Duration::from_millis(1)).validate().is_ok());
        assert!(PersistPolicy::EveryPush.validate().is_ok());
    }

    #[tokio::test]
    async fn shutdown_survives_a_failed_task() {
        let (stop_tx, _stop_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(async { panic!("interval task died") });
        let handle = PersistHandle { stop_tx, task };

        // The join error is logged, not propagated as a panic
        handle.shutdown().await;
    }

    #[test]
    fn default_policy_is_one_second_interval() {
        assert_eq!(
            PersistPolicy::default(),
            PersistPolicy::Interval(Duration::from_secs(1))
        );
    }
}
