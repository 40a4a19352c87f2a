//! Snapshot persistence for channel buffers.
//!
//! A snapshot is the ordered list of a channel's samples, stored as a JSON
//! array of `{timestamp, value}` records keyed by channel id. Loading never
//! fails: a missing or corrupt snapshot reads back as empty.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use climawatch_types::Sample;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Key-value persistence of channel snapshots.
///
/// Each channel's snapshot is independent; there is no transaction across
/// channels.
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Overwrite the snapshot stored for `channel_id`.
    fn save(&self, channel_id: &str, samples: &[Sample]) -> Result<(), StorageError>;

    /// Load the snapshot for `channel_id`, or an empty list if there is none
    /// or it cannot be read.
    fn load(&self, channel_id: &str) -> Vec<Sample>;
}

/// Stores one JSON file per channel in a directory.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never observes a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory snapshots are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot file for a channel.
    pub fn path_for(&self, channel_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(channel_id)))
    }
}

/// Map a channel id to a safe file stem.
///
/// ASCII letters, digits and `-` are kept; every other byte, `_` included,
/// becomes `_XX` in upper-case hex (`clima/lux` -> `clima_2Flux`). The
/// mapping is injective, so distinct ids never share a file.
fn file_stem(channel_id: &str) -> String {
    let mut stem = String::with_capacity(channel_id.len());
    for byte in channel_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, channel_id: &str, samples: &[Sample]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec_pretty(samples)?;
        let target = self.path_for(channel_id);
        let tmp = target.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp, &target)?;

        debug!(channel = channel_id, samples = samples.len(), "snapshot saved");
        Ok(())
    }

    fn load(&self, channel_id: &str) -> Vec<Sample> {
        let path = self.path_for(channel_id);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(channel = channel_id, path = %path.display(), error = %e, "snapshot unreadable, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&content) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(channel = channel_id, path = %path.display(), error = %e, "snapshot corrupt, starting empty");
                Vec::new()
            }
        }
    }
}

/// In-memory store, useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<String, Vec<Sample>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels with a stored snapshot.
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, channel_id: &str, samples: &[Sample]) -> Result<(), StorageError> {
        self.snapshots
            .write()
            .insert(channel_id.to_string(), samples.to_vec());
        Ok(())
    }

    fn load(&self, channel_id: &str) -> Vec<Sample> {
        self.snapshots
            .read()
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn samples() -> Vec<Sample> {
        vec![Sample::new(1000, 20.5), Sample::new(2000, 21.0)]
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        store.save("temp", &samples()).unwrap();
        assert_eq!(store.load("temp"), samples());
        assert!(!dir.path().join("temp.json.tmp").exists());
    }

    #[test]
    fn test_file_store_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        store.save("temp", &samples()).unwrap();
        store.save("temp", &[Sample::new(3000, 1.0)]).unwrap();
        assert_eq!(store.load("temp"), vec![Sample::new(3000, 1.0)]);
    }

    #[test]
    fn test_file_store_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        assert!(store.load("nothing").is_empty());
    }

    #[test]
    fn test_file_store_corrupt_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        fs::write(store.path_for("temp"), "not valid json").unwrap();
        assert!(store.load("temp").is_empty());
    }

    #[test]
    fn test_file_store_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested").join("snapshots"));
        store.save("vibr", &samples()).unwrap();
        assert_eq!(store.load("vibr").len(), 2);
    }

    #[test]
    fn test_file_store_save_fails_on_bad_dir() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let store = FileSnapshotStore::new(&blocker);
        let err = store.save("temp", &samples()).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn file_stem_escapes_topic_like_ids() {
        assert_eq!(file_stem("temp"), "temp");
        assert_eq!(file_stem("clima/humedad_suelo"), "clima_2Fhumedad_5Fsuelo");
        assert_eq!(file_stem("../etc"), "_2E_2E_2Fetc");
        assert_eq!(file_stem("presión"), "presi_C3_B3n");
    }

    #[test]
    fn similar_ids_keep_separate_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        store.save("clima/lux", &[Sample::new(1, 1.0)]).unwrap();
        store.save("clima_lux", &[Sample::new(2, 2.0)]).unwrap();
        store.save("clima_2Flux", &[Sample::new(3, 3.0)]).unwrap();

        assert_ne!(store.path_for("clima/lux"), store.path_for("clima_lux"));
        assert_eq!(store.load("clima/lux"), vec![Sample::new(1, 1.0)]);
        assert_eq!(store.load("clima_lux"), vec![Sample::new(2, 2.0)]);
        assert_eq!(store.load("clima_2Flux"), vec![Sample::new(3, 3.0)]);
    }

    #[test]
    fn test_snapshot_format_is_record_array() {
        let dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(dir.path());
        store.save("temp", &[Sample::new(5, 1.5)]).unwrap();

        let raw = fs::read_to_string(store.path_for("temp")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{ "timestamp": 5, "value": 1.5 }]));
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert!(store.load("temp").is_empty());
        store.save("temp", &samples()).unwrap();
        assert_eq!(store.load("temp"), samples());
        assert_eq!(store.len(), 1);
    }
}
