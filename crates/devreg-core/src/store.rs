//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Device registry core: model, store contract, topology and service."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::model::Device;

/// Errors reported by [`DeviceStore`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A device with this MAC address is already stored.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// The backing medium failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Durable device storage keyed by MAC address.
///
/// `get_all` enumerates devices in insertion order. `put` must reject an
/// existing MAC atomically; that check is what keeps concurrent
/// registrations of the same address from both succeeding.
pub trait DeviceStore: Send + Sync + 'static {
    fn exists(&self, mac: &str) -> Result<bool, StoreError>;

    fn get(&self, mac: &str) -> Result<Option<Device>, StoreError>;

    fn put(&self, device: Device) -> Result<(), StoreError>;

    fn get_all(&self) -> Result<Vec<Device>, StoreError>;
}

/// Volatile store backed by an insertion-ordered map.
#[derive(Debug, Default)]
pub struct InMemoryDeviceStore {
    devices: RwLock<IndexMap<String, Device>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with devices, in the given order, bypassing validation.
    ///
    /// Later entries with an already seen MAC replace the earlier ones in place.
    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let map = devices
            .into_iter()
            .map(|device| (device.mac_address.clone(), device))
            .collect();
        Self {
            devices: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl DeviceStore for InMemoryDeviceStore {
    fn exists(&self, mac: &str) -> Result<bool, StoreError> {
        Ok(self.devices.read().contains_key(mac))
    }

    fn get(&self, mac: &str) -> Result<Option<Device>, StoreError> {
        Ok(self.devices.read().get(mac).cloned())
    }

    fn put(&self, device: Device) -> Result<(), StoreError> {
        let mut devices = self.devices.write();
        if devices.contains_key(&device.mac_address) {
            return Err(StoreError::DuplicateKey(device.mac_address));
        }
        devices.insert(device.mac_address.clone(), device);
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<Device>, StoreError> {
        Ok(self.devices.read().values().cloned().collect())
    }
}
