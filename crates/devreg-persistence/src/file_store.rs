//! ---
//! devreg_section: "03-persistence-logging"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Persistence abstractions and storage bindings."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use devreg_core::{Device, DeviceStore, StoreError};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::metrics::PersistenceMetrics;
use crate::snapshot::{load_snapshot, save_snapshot};
use crate::Result;

/// Device store that keeps its contents in memory and mirrors every
/// registration to a snapshot file.
///
/// Reads are served from memory. A failed snapshot write rolls the insert
/// back, so the file and the in-memory view never disagree.
pub struct FileDeviceStore {
    path: PathBuf,
    devices: RwLock<IndexMap<String, Device>>,
    metrics: Option<PersistenceMetrics>,
}

impl FileDeviceStore {
    /// Open the store at `path`, loading the snapshot if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_metrics(path, None)
    }

    /// Open the store and report snapshot activity to `metrics`.
    pub fn open_with_metrics(
        path: impl Into<PathBuf>,
        metrics: Option<PersistenceMetrics>,
    ) -> Result<Self> {
        let path = path.into();
        let started = Instant::now();
        let loaded = if path.exists() {
            load_snapshot(&path)?
        } else {
            debug!(path = %path.display(), "no device snapshot found; starting empty");
            Vec::new()
        };
        if let Some(metrics) = &metrics {
            metrics.observe_load_duration(started.elapsed().as_secs_f64());
        }
        info!(path = %path.display(), device_count = loaded.len(), "device snapshot loaded");

        let devices = loaded
            .into_iter()
            .map(|device| (device.mac_address.clone(), device))
            .collect();
        Ok(Self {
            path,
            devices: RwLock::new(devices),
            metrics,
        })
    }

    /// Location of the backing snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored devices.
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Whether the store holds no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl DeviceStore for FileDeviceStore {
    fn exists(&self, mac: &str) -> std::result::Result<bool, StoreError> {
        Ok(self.devices.read().contains_key(mac))
    }

    fn get(&self, mac: &str) -> std::result::Result<Option<Device>, StoreError> {
        Ok(self.devices.read().get(mac).cloned())
    }

    fn put(&self, device: Device) -> std::result::Result<(), StoreError> {
        let mut devices = self.devices.write();
        if devices.contains_key(&device.mac_address) {
            return Err(StoreError::DuplicateKey(device.mac_address));
        }
        let mac = device.mac_address.clone();
        devices.insert(mac.clone(), device);

        let snapshot: Vec<Device> = devices.values().cloned().collect();
        match save_snapshot(&snapshot, &self.path) {
            Ok(bytes) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_snapshot_written(bytes);
                }
                debug!(path = %self.path.display(), mac = %mac, bytes, "device snapshot written");
                Ok(())
            }
            Err(err) => {
                devices.pop();
                if let Some(metrics) = &self.metrics {
                    metrics.record_snapshot_failed();
                }
                error!(path = %self.path.display(), mac = %mac, error = %err, "device snapshot write failed");
                Err(StoreError::Backend(format!(
                    "failed to write snapshot {}: {err}",
                    self.path.display()
                )))
            }
        }
    }

    fn get_all(&self) -> std::result::Result<Vec<Device>, StoreError> {
        Ok(self.devices.read().values().cloned().collect())
    }
}

impl fmt::Debug for FileDeviceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDeviceStore")
            .field("path", &self.path)
            .field("devices", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devreg_core::DeviceType;
    use tempfile::tempdir;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let store = FileDeviceStore::open(dir.path().join("devices.json")).unwrap();
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn failed_write_rolls_back_insert() {
        let dir = tempdir().unwrap();
        // A directory at the snapshot path makes the rename fail.
        let path = dir.path().join("devices.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let store = FileDeviceStore::open_with_metrics(&path, None);
        // Opening tries to read the directory as a file.
        assert!(store.is_err());

        let blocked = dir.path().join("blocked.json");
        let store = FileDeviceStore::open(&blocked).unwrap();
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();

        let err = store
            .put(Device::new("gw", DeviceType::Gateway))
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(!store.exists("gw").unwrap());
    }
}
